//! Item quality: point-biserial discrimination plus a short rule ladder.

use chrono::{DateTime, Utc};

use crate::assessment::config::QualityConfig;
use crate::assessment::round_half_up;
use crate::assessment::types::{QualityAssessment, QualityMetrics, QualityStatus};
use crate::store::operations::attempts::AttemptRecord;
use crate::store::operations::items::ItemQuality;

/// Point-biserial index over each response's user-average snapshot.
///
/// Returns 0 when either outcome group is empty, the snapshots have no
/// spread, or the arithmetic overflows. Population standard deviation.
pub fn point_biserial(attempts: &[AttemptRecord], missing_snapshot: f64) -> f64 {
    if attempts.is_empty() {
        return 0.0;
    }
    let snapshot = |a: &AttemptRecord| a.user_exam_average.unwrap_or(missing_snapshot);

    let n = attempts.len() as f64;
    let correct: Vec<f64> = attempts
        .iter()
        .filter(|a| a.is_correct)
        .map(snapshot)
        .collect();
    if correct.is_empty() || correct.len() == attempts.len() {
        return 0.0;
    }

    let mean_correct = correct.iter().sum::<f64>() / correct.len() as f64;
    let mean_total = attempts.iter().map(snapshot).sum::<f64>() / n;
    let variance = attempts
        .iter()
        .map(|a| (snapshot(a) - mean_total).powi(2))
        .sum::<f64>()
        / n;
    let stdev = variance.sqrt();
    if stdev == 0.0 {
        return 0.0;
    }

    let p = correct.len() as f64 / n;
    let q = 1.0 - p;
    finite_or_zero(((mean_correct - mean_total) / stdev) * (p / q).sqrt())
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub struct QualityEvaluator<'a> {
    config: &'a QualityConfig,
}

impl<'a> QualityEvaluator<'a> {
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    /// Evaluates one item from its recent responses (newest first).
    pub fn evaluate(&self, attempts: &[AttemptRecord]) -> QualityAssessment {
        if attempts.is_empty() || attempts.len() < self.config.sample_floor {
            return QualityAssessment {
                status: QualityStatus::InsufficientData,
                score: None,
                metrics: None,
            };
        }

        let n = attempts.len() as f64;
        let total_time: f64 = attempts.iter().map(|a| a.time_spent_secs.unwrap_or(0.0)).sum();
        let correct = attempts.iter().filter(|a| a.is_correct).count();
        let views = attempts
            .iter()
            .filter(|a| a.explanation_viewed.unwrap_or(false))
            .count();

        let avg_time_secs = finite_or_zero(total_time / n);
        let accuracy = correct as f64 / n;
        let discrimination_index = point_biserial(attempts, self.config.missing_snapshot_default);
        let (status, memorization_risk) = self.classify(avg_time_secs, accuracy, discrimination_index);

        QualityAssessment {
            status,
            score: Some(round_half_up(discrimination_index * 100.0) as i64),
            metrics: Some(QualityMetrics {
                avg_time_secs,
                accuracy,
                discrimination_index,
                memorization_risk,
                explanation_view_rate: views as f64 / n,
                sample_size: attempts.len(),
            }),
        }
    }

    /// Status plus whether the memorization rule fired.
    pub fn classify(&self, avg_time_secs: f64, accuracy: f64, discrimination: f64) -> (QualityStatus, bool) {
        let c = self.config;
        let memorized = avg_time_secs < c.memorization_max_avg_time_secs
            && accuracy > c.memorization_min_accuracy
            && discrimination < c.memorization_max_discrimination;

        let status = if memorized {
            QualityStatus::NeedsVariant
        } else if discrimination < c.reword_below {
            QualityStatus::NeedsReword
        } else if discrimination < c.monitor_below {
            QualityStatus::Monitor
        } else {
            QualityStatus::Stable
        };
        (status, memorized)
    }
}

/// Builds the record to persist. A gated evaluation only refreshes status and
/// timestamp; the last computed score and metrics are carried over.
pub fn next_quality(
    previous: Option<&ItemQuality>,
    assessment: &QualityAssessment,
    now: DateTime<Utc>,
) -> ItemQuality {
    match assessment.status {
        QualityStatus::InsufficientData => ItemQuality {
            quality_score: previous.and_then(|p| p.quality_score),
            quality_status: QualityStatus::InsufficientData,
            metrics: previous.and_then(|p| p.metrics.clone()),
            last_evaluated: now,
        },
        status => ItemQuality {
            quality_score: assessment.score,
            quality_status: status,
            metrics: assessment.metrics.clone(),
            last_evaluated: now,
        },
    }
}
