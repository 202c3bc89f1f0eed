use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::extractors::QueryParams;
use crate::response::{ok, AppError};
use crate::routes::{check_id, default_exam_id};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:user_id", get(get_readiness))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessQuery {
    #[serde(default = "default_exam_id")]
    exam_id: String,
}

async fn get_readiness(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    QueryParams(q): QueryParams<ReadinessQuery>,
) -> Result<impl IntoResponse, AppError> {
    check_id("userId", &user_id)?;
    check_id("examId", &q.exam_id)?;
    let report = state.engine().readiness(&user_id, &q.exam_id).await?;
    Ok(ok(report))
}
