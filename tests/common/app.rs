use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use assessment_backend::assessment::config::EngineConfig;
use assessment_backend::assessment::engine::AssessmentEngine;
use assessment_backend::assessment::shuffle::IdentityShuffler;
use assessment_backend::config::{Config, EngineEnvConfig, WorkerConfig};
use assessment_backend::routes::build_router;
use assessment_backend::state::AppState;
use assessment_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn store(&self) -> &Store {
        self.state.store()
    }
}

// Config is built by hand: set_var would race across parallel tests.
fn test_config(temp_dir: &TempDir) -> Config {
    let sled_path = temp_dir.path().join("assessment-test.sled");
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        worker: WorkerConfig {
            is_leader: false,
            enable_quality_evaluation: false,
            quality_cron: "0 0 * * * *".to_string(),
        },
        engine: EngineEnvConfig::default(),
    }
}

/// Selection order is deterministic: every shuffle is the identity.
pub async fn spawn_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&temp_dir);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let engine = Arc::new(AssessmentEngine::with_shuffler(
        EngineConfig::from_env(&config.engine),
        store.clone(),
        Arc::new(IdentityShuffler),
    ));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store, engine, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        _temp_dir: temp_dir,
    }
}
