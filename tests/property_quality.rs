use chrono::Utc;
use proptest::prelude::*;

use assessment_backend::assessment::config::QualityConfig;
use assessment_backend::assessment::quality::{point_biserial, QualityEvaluator};
use assessment_backend::assessment::types::QualityStatus;
use assessment_backend::store::operations::attempts::AttemptRecord;

fn attempt(n: usize, is_correct: bool, time: f64, snapshot: Option<f64>) -> AttemptRecord {
    AttemptRecord {
        id: format!("a{n}"),
        user_id: format!("u{n}"),
        item_id: "q1".to_string(),
        exam_id: "pmp".to_string(),
        domain: "People".to_string(),
        is_correct,
        created_at: Utc::now(),
        time_spent_secs: Some(time),
        explanation_viewed: Some(false),
        user_exam_average: snapshot,
    }
}

fn attempts_strategy() -> impl Strategy<Value = Vec<AttemptRecord>> {
    proptest::collection::vec(
        (any::<bool>(), 0.0_f64..300.0, proptest::option::of(0.0_f64..100.0)),
        0..80,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(n, (ok, time, snap))| attempt(n, ok, time, snap))
            .collect()
    })
}

proptest! {
    #[test]
    fn pt_discrimination_is_finite_and_bounded(attempts in attempts_strategy()) {
        let d = point_biserial(&attempts, 70.0);
        prop_assert!(d.is_finite());
        prop_assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&d));
    }

    #[test]
    fn pt_small_samples_are_insufficient(attempts in attempts_strategy()) {
        let cfg = QualityConfig::default();
        let assessment = QualityEvaluator::new(&cfg).evaluate(&attempts);
        if attempts.len() < cfg.sample_floor {
            prop_assert_eq!(assessment.status, QualityStatus::InsufficientData);
            prop_assert!(assessment.score.is_none());
            prop_assert!(assessment.metrics.is_none());
        } else {
            prop_assert_ne!(assessment.status, QualityStatus::InsufficientData);
            let metrics = assessment.metrics.expect("metrics for full sample");
            prop_assert_eq!(metrics.sample_size, attempts.len());
            prop_assert!((0.0..=1.0).contains(&metrics.accuracy));
        }
    }

    #[test]
    fn pt_classification_is_total_and_ordered(
        avg_time in 0.0_f64..200.0,
        accuracy in 0.0_f64..=1.0,
        discrimination in -1.0_f64..=1.0,
    ) {
        let cfg = QualityConfig::default();
        let (status, memorized) = QualityEvaluator::new(&cfg).classify(avg_time, accuracy, discrimination);
        if memorized {
            prop_assert_eq!(status, QualityStatus::NeedsVariant);
        } else if discrimination >= cfg.monitor_below {
            prop_assert_eq!(status, QualityStatus::Stable);
        } else if discrimination < cfg.reword_below {
            prop_assert_eq!(status, QualityStatus::NeedsReword);
        } else {
            prop_assert_eq!(status, QualityStatus::Monitor);
        }
    }
}
