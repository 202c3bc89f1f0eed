use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::response::AppError;
use crate::state::AppState;

const PROBE_KEY: &str = "__health_check__";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/database", get(database_health))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "items": state.store().count_items(),
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

pub async fn readiness(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    match state.store().get_item(PROBE_KEY) {
        Ok(_) => Ok(StatusCode::OK),
        Err(e) => {
            tracing::error!(error = %e, "Store probe failed");
            Err(AppError::service_unavailable("Store is not ready"))
        }
    }
}

pub async fn database_health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let healthy = state.store().get_item(PROBE_KEY).is_ok();
    let latency_us = start.elapsed().as_micros() as u64;

    Json(serde_json::json!({
        "healthy": healthy,
        "latencyUs": latency_us,
        "sizeOnDiskBytes": state.store().raw_db().size_on_disk().unwrap_or(0),
    }))
}
