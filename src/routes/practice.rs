use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::types::{
    AnswerSubmission, SessionRequest, TrapSessionRequest, WeakDomainQuizRequest,
};
use crate::extractors::JsonBody;
use crate::response::{created, ok, AppError};
use crate::routes::{check_id, check_size, default_exam_id};
use crate::state::AppState;
use crate::store::operations::items::Item;
use crate::store::operations::runs::{QuizMode, QuizRun, RunAnswer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", post(practice_session))
        .route("/trap-session", post(trap_session))
        .route("/simulation", post(simulation))
        .route("/weak-domains", post(weak_domain_quiz))
        .route("/diagnostic", post(diagnostic))
        .route("/answers", post(record_answer))
        .route("/runs", post(record_run))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    item_ids: Vec<String>,
    items: Vec<Item>,
}

impl From<Vec<Item>> for SessionResponse {
    fn from(items: Vec<Item>) -> Self {
        Self {
            item_ids: items.iter().map(|i| i.id.clone()).collect(),
            items,
        }
    }
}

async fn practice_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_id("userId", &req.user_id)?;
    check_id("examId", &req.exam_id)?;
    if let Some(domain) = req.domain.as_deref() {
        check_id("domain", domain)?;
    }
    if let Some(size) = req.size {
        check_size(size)?;
    }
    let items = state.engine().practice_session(&req).await;
    Ok(ok(SessionResponse::from(items)))
}

async fn trap_session(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<TrapSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_id("examId", &req.exam_id)?;
    if let Some(tag) = req.domain_tags.first() {
        check_id("domainTags", tag)?;
    }
    if let Some(size) = req.size {
        check_size(size)?;
    }
    if !(0.0..=100.0).contains(&req.mastery_score) {
        return Err(AppError::bad_request(
            "INVALID_MASTERY_SCORE",
            "masteryScore must be between 0 and 100",
        ));
    }
    let items = state.engine().trap_session(&req).await;
    Ok(ok(SessionResponse::from(items)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulationRequest {
    #[serde(default = "default_exam_id")]
    exam_id: String,
    #[serde(default = "default_simulation_size")]
    size: usize,
}

fn default_simulation_size() -> usize {
    50
}

async fn simulation(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SimulationRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_id("examId", &req.exam_id)?;
    let size = check_size(req.size)?;
    let items = state.engine().simulation_set(&req.exam_id, size).await;
    Ok(ok(SessionResponse::from(items)))
}

async fn weak_domain_quiz(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<WeakDomainQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_id("userId", &req.user_id)?;
    check_id("examId", &req.exam_id)?;
    check_size(req.size)?;
    let items = state.engine().weak_domain_quiz(&req).await;
    Ok(ok(SessionResponse::from(items)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiagnosticRequest {
    #[serde(default = "default_exam_id")]
    exam_id: String,
}

async fn diagnostic(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DiagnosticRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_id("examId", &req.exam_id)?;
    let items = state.engine().diagnostic_set(&req.exam_id).await;
    Ok(ok(SessionResponse::from(items)))
}

async fn record_answer(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AnswerSubmission>,
) -> Result<impl IntoResponse, AppError> {
    check_id("userId", &req.user_id)?;
    check_id("itemId", &req.item_id)?;
    if req.time_spent_secs.is_some_and(|t| !t.is_finite() || t < 0.0) {
        return Err(AppError::bad_request(
            "INVALID_TIME_SPENT",
            "timeSpentSecs must be a non-negative number",
        ));
    }
    if req
        .user_exam_average
        .is_some_and(|avg| !avg.is_finite() || !(0.0..=100.0).contains(&avg))
    {
        return Err(AppError::bad_request(
            "INVALID_USER_EXAM_AVERAGE",
            "userExamAverage must be a percentage between 0 and 100",
        ));
    }
    let progress = state.engine().record_answer(&req).await?;
    Ok(created(progress))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordRunRequest {
    #[serde(default)]
    id: Option<String>,
    user_id: String,
    #[serde(default = "default_exam_id")]
    exam_id: String,
    mode: QuizMode,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    correct: u32,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    answers: Vec<RunAnswer>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

async fn record_run(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RecordRunRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_id("userId", &req.user_id)?;
    check_id("examId", &req.exam_id)?;
    let run_id = req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    check_id("id", &run_id)?;

    let run = QuizRun {
        id: run_id,
        user_id: req.user_id,
        exam_id: req.exam_id,
        mode: req.mode,
        domain: req.domain,
        correct: req.correct,
        total: req.total,
        answers: req.answers,
        completed_at: req.completed_at.unwrap_or_else(Utc::now),
    };
    let stored = state.engine().record_run(run).await?;
    Ok(created(stored))
}
