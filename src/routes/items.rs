use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::routes::{check_id, default_exam_id};
use crate::state::AppState;
use crate::store::operations::items::Item;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", put(upsert_item))
        .route("/:item_id", get(get_item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertItemRequest {
    id: String,
    #[serde(default = "default_exam_id")]
    exam_id: String,
    stem: String,
    options: Vec<String>,
    correct_index: usize,
    #[serde(default)]
    explanation: String,
    domain: String,
    #[serde(default)]
    difficulty: Option<f64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

async fn upsert_item(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpsertItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = Item {
        id: req.id,
        exam_id: req.exam_id,
        stem: req.stem,
        options: req.options,
        correct_index: req.correct_index,
        explanation: req.explanation,
        domain: req.domain,
        difficulty: req.difficulty,
        quality: None,
        created_at: req.created_at.unwrap_or_else(Utc::now),
    };
    let stored = state.store().upsert_item(&item)?;
    tracing::info!(item_id = %stored.id, exam_id = %stored.exam_id, domain = %stored.domain, "Item upserted");
    Ok(ok(stored))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemDetail {
    #[serde(flatten)]
    item: Item,
    attempt_count: usize,
}

async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    check_id("itemId", &item_id)?;
    let item = state
        .store()
        .get_item(&item_id)?
        .ok_or_else(|| AppError::not_found(&format!("Item not found: {item_id}")))?;
    let attempt_count = state.store().count_item_attempts(&item_id)?;
    Ok(ok(ItemDetail {
        item,
        attempt_count,
    }))
}
