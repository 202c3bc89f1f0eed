use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EXAM_ID;
use crate::store::operations::items::Item;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

/// Candidate items partitioned by the user's progress state.
#[derive(Debug, Clone, Default)]
pub struct SessionPools {
    pub new: Vec<Item>,
    pub learning: Vec<Item>,
    pub mastered: Vec<Item>,
}

fn default_exam_id() -> String {
    DEFAULT_EXAM_ID.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_id: String,
    #[serde(default = "default_exam_id")]
    pub exam_id: String,
    #[serde(default)]
    pub tier: Tier,
    /// Overrides the tier's session size.
    #[serde(default)]
    pub size: Option<usize>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapSessionRequest {
    #[serde(default = "default_exam_id")]
    pub exam_id: String,
    /// Only the first tag narrows the pool.
    #[serde(default)]
    pub domain_tags: Vec<String>,
    #[serde(default)]
    pub mastery_score: f64,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakDomainQuizRequest {
    pub user_id: String,
    #[serde(default = "default_exam_id")]
    pub exam_id: String,
    pub size: usize,
    #[serde(default)]
    pub exclude_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub user_id: String,
    pub item_id: String,
    pub is_correct: bool,
    #[serde(default)]
    pub time_spent_secs: Option<f64>,
    #[serde(default)]
    pub explanation_viewed: Option<bool>,
    #[serde(default)]
    pub user_exam_average: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DomainStatus {
    Weak,
    Insufficient,
    Moderate,
    Strong,
}

impl DomainStatus {
    /// Sort rank, most actionable first.
    pub fn priority(self) -> u8 {
        match self {
            DomainStatus::Weak => 0,
            DomainStatus::Insufficient => 1,
            DomainStatus::Moderate => 2,
            DomainStatus::Strong => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainReadiness {
    pub domain: String,
    pub score: u32,
    pub total_questions: u64,
    pub status: DomainStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub exam_id: String,
    /// `None` until at least one question has been answered.
    pub overall_score: Option<u32>,
    pub trend: Trend,
    pub domains: Vec<DomainReadiness>,
    pub total_questions_answered: u64,
    pub mock_exams_taken: u32,
    pub is_preliminary: bool,
}

impl ReadinessReport {
    pub fn empty(exam_id: &str) -> Self {
        Self {
            exam_id: exam_id.to_string(),
            overall_score: None,
            trend: Trend::Stable,
            domains: Vec::new(),
            total_questions_answered: 0,
            mock_exams_taken: 0,
            is_preliminary: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    InsufficientData,
    Stable,
    Monitor,
    NeedsReword,
    NeedsVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub avg_time_secs: f64,
    pub accuracy: f64,
    pub discrimination_index: f64,
    pub memorization_risk: bool,
    pub explanation_view_rate: f64,
    pub sample_size: usize,
}

/// Outcome of evaluating one item, before it is written back.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAssessment {
    pub status: QualityStatus,
    /// Present only when the sample cleared the floor.
    pub score: Option<i64>,
    pub metrics: Option<QualityMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QualitySummary {
    pub processed: u32,
    pub insufficient_data: u32,
    pub stable: u32,
    pub monitor: u32,
    pub needs_reword: u32,
    pub needs_variant: u32,
    pub write_failures: u32,
}

impl QualitySummary {
    pub fn count(&mut self, status: QualityStatus) {
        match status {
            QualityStatus::InsufficientData => self.insufficient_data += 1,
            QualityStatus::Stable => self.stable += 1,
            QualityStatus::Monitor => self.monitor += 1,
            QualityStatus::NeedsReword => self.needs_reword += 1,
            QualityStatus::NeedsVariant => self.needs_variant += 1,
        }
    }
}
