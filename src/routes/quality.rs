use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/evaluate", post(evaluate_batch))
}

/// Operator-triggered run of the same batch the scheduled worker performs.
async fn evaluate_batch(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summary = state.engine().evaluate_batch().await?;
    Ok(ok(summary))
}
