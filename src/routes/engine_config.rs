use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::assessment::config::EngineConfig;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/config", get(get_config).put(update_config))
}

async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    ok(state.engine().get_config().await)
}

async fn update_config(
    State(state): State<AppState>,
    JsonBody(new_config): JsonBody<EngineConfig>,
) -> Result<impl IntoResponse, AppError> {
    state
        .engine()
        .reload_config(new_config)
        .await
        .map_err(|msg| AppError::bad_request("INVALID_ENGINE_CONFIG", &msg))?;
    Ok(ok(state.engine().get_config().await))
}
