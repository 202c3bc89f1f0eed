pub mod engine_config;
pub mod health;
pub mod items;
pub mod practice;
pub mod quality;
pub mod readiness;

use axum::extract::DefaultBodyLimit;
use axum::response::IntoResponse;
use axum::Router;

use crate::constants::{DEFAULT_EXAM_ID, MAX_REQUEST_SIZE};
use crate::response::AppError;
use crate::state::AppState;
use crate::store::keys;

/// Maximum request body size: 2 MiB.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/items", items::router())
        .nest("/practice", practice::router())
        .nest("/readiness", readiness::router())
        .nest("/quality", quality::router())
        .nest("/engine", engine_config::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::router())
        .fallback(fallback_404)
        .with_state(state)
}

async fn fallback_404() -> impl IntoResponse {
    AppError::not_found("Route not found")
}

/// Rejects ids that the store could not key on.
pub(crate) fn check_id(field: &'static str, value: &str) -> Result<(), AppError> {
    keys::segment(field, value)?;
    Ok(())
}

pub(crate) fn check_size(size: usize) -> Result<usize, AppError> {
    if size == 0 || size > MAX_REQUEST_SIZE {
        return Err(AppError::bad_request(
            "INVALID_SIZE",
            &format!("size must be between 1 and {MAX_REQUEST_SIZE}"),
        ));
    }
    Ok(size)
}

pub(crate) fn default_exam_id() -> String {
    DEFAULT_EXAM_ID.to_string()
}
