use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub worker: WorkerConfig,
    pub engine: EngineEnvConfig,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub enable_quality_evaluation: bool,
    /// Six-field cron expression (with seconds).
    pub quality_cron: String,
}

/// Engine tunables that can be set from the environment. Everything else in
/// `EngineConfig` keeps its default until reloaded over HTTP.
#[derive(Debug, Clone)]
pub struct EngineEnvConfig {
    pub session_size_free: usize,
    pub session_size_pro: usize,
    pub mastery_threshold: u32,
    pub mastered_ratio_cap: f64,
    pub trap_stable_threshold: f64,
    pub quality_sample_floor: usize,
    pub quality_batch_size: usize,
    pub readiness_recent_window: usize,
    pub domain_insufficient_floor: u64,
    pub exam_definitions_path: Option<String>,
}

impl Default for EngineEnvConfig {
    fn default() -> Self {
        Self {
            session_size_free: 5,
            session_size_pro: 10,
            mastery_threshold: 2,
            mastered_ratio_cap: 0.30,
            trap_stable_threshold: 70.0,
            quality_sample_floor: 30,
            quality_batch_size: 50,
            readiness_recent_window: 5,
            domain_insufficient_floor: 10,
            exam_definitions_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let engine_defaults = EngineEnvConfig::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/assessment.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
                enable_quality_evaluation: env_or_bool("ENABLE_QUALITY_WORKER", true),
                quality_cron: env_or("QUALITY_WORKER_CRON", "0 0 * * * *"),
            },
            engine: EngineEnvConfig {
                session_size_free: env_or_parse("SESSION_SIZE_FREE", engine_defaults.session_size_free),
                session_size_pro: env_or_parse("SESSION_SIZE_PRO", engine_defaults.session_size_pro),
                mastery_threshold: env_or_parse("MASTERY_THRESHOLD", engine_defaults.mastery_threshold),
                mastered_ratio_cap: env_or_parse("MASTERED_RATIO_CAP", engine_defaults.mastered_ratio_cap),
                trap_stable_threshold: env_or_parse(
                    "TRAP_STABLE_THRESHOLD",
                    engine_defaults.trap_stable_threshold,
                ),
                quality_sample_floor: env_or_parse(
                    "QUALITY_SAMPLE_FLOOR",
                    engine_defaults.quality_sample_floor,
                ),
                quality_batch_size: env_or_parse("QUALITY_BATCH_SIZE", engine_defaults.quality_batch_size),
                readiness_recent_window: env_or_parse(
                    "READINESS_RECENT_WINDOW",
                    engine_defaults.readiness_recent_window,
                ),
                domain_insufficient_floor: env_or_parse(
                    "DOMAIN_INSUFFICIENT_FLOOR",
                    engine_defaults.domain_insufficient_floor,
                ),
                exam_definitions_path: env::var("EXAM_DEFINITIONS_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty()),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
