use std::net::SocketAddr;
use std::sync::Arc;

use assessment_backend::assessment::config::EngineConfig;
use assessment_backend::assessment::engine::AssessmentEngine;
use assessment_backend::config::Config;
use assessment_backend::logging::{init_tracing, LogConfig};
use assessment_backend::routes::build_router;
use assessment_backend::state::AppState;
use assessment_backend::store::Store;
use assessment_backend::workers::WorkerManager;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&LogConfig::from(&config));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting assessment-backend");

    let store = Arc::new(Store::open(&config.sled_path).expect("Failed to open sled database"));
    store.run_migrations().expect("Failed to run migrations");

    let engine_config = EngineConfig::from_env(&config.engine);
    let engine = Arc::new(AssessmentEngine::new(engine_config, store.clone()));

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store.clone(), engine.clone(), shutdown_tx.clone());

    let worker_handle = config.worker.is_leader.then(|| {
        let manager = WorkerManager::new(engine.clone(), shutdown_tx.subscribe(), &config.worker);
        tokio::spawn(async move {
            if let Err(e) = manager.start().await {
                tracing::error!(error = %e, "Worker manager failed");
            }
        })
    });

    let app = with_http_layers(build_router(state), &config);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!(%addr, "Listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx));

    if let Some(handle) = worker_handle {
        // A panicking worker must not take the HTTP server down with it.
        tokio::spawn(async move {
            match handle.await {
                Err(e) => tracing::error!(error = %e, "Worker task panicked"),
                Ok(()) => tracing::info!("Worker manager exited"),
            }
        });
    }

    if let Err(e) = server.await {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
}

fn with_http_layers(router: Router, config: &Config) -> Router {
    // Outermost first.
    router.layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(config)),
    )
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::ACCEPT];

    if config.cors_origin.trim() == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers),
        Err(e) => panic!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e),
    }
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
