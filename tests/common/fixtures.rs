use chrono::{DateTime, Duration, Utc};

use assessment_backend::store::operations::attempts::AttemptRecord;
use assessment_backend::store::operations::items::Item;
use assessment_backend::store::operations::progress::{ItemProgress, ProgressStatus};
use assessment_backend::store::operations::runs::{QuizMode, QuizRun};
use assessment_backend::store::Store;

pub fn item(id: &str, exam_id: &str, domain: &str) -> Item {
    Item {
        id: id.to_string(),
        exam_id: exam_id.to_string(),
        stem: format!("Which option best answers {id}?"),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_index: 1,
        explanation: String::new(),
        domain: domain.to_string(),
        difficulty: None,
        quality: None,
        created_at: Utc::now(),
    }
}

/// Seeds `count` items named `{prefix}-{n}` in one domain.
pub fn seed_items(store: &Store, exam_id: &str, domain: &str, prefix: &str, count: usize) -> Vec<Item> {
    (0..count)
        .map(|n| {
            store
                .upsert_item(&item(&format!("{prefix}-{n}"), exam_id, domain))
                .expect("upsert seed item")
        })
        .collect()
}

pub fn seed_progress(store: &Store, user_id: &str, item: &Item, status: ProgressStatus) {
    let consecutive_correct = match status {
        ProgressStatus::New => 0,
        ProgressStatus::Learning => 1,
        ProgressStatus::Mastered => 2,
    };
    store
        .upsert_item_progress(&ItemProgress {
            user_id: user_id.to_string(),
            item_id: item.id.clone(),
            exam_id: item.exam_id.clone(),
            status,
            consecutive_correct,
            domain: item.domain.clone(),
            last_attempted: Utc::now(),
        })
        .expect("upsert seed progress");
}

pub struct AttemptSeed {
    pub is_correct: bool,
    pub time_spent_secs: f64,
    pub explanation_viewed: bool,
    pub user_exam_average: Option<f64>,
}

pub fn seed_attempts(store: &Store, item: &Item, seeds: &[AttemptSeed]) {
    let start = Utc::now() - Duration::hours(1);
    for (n, seed) in seeds.iter().enumerate() {
        store
            .append_attempt(&AttemptRecord {
                id: format!("{}-attempt-{n}", item.id),
                user_id: format!("learner-{n}"),
                item_id: item.id.clone(),
                exam_id: item.exam_id.clone(),
                domain: item.domain.clone(),
                is_correct: seed.is_correct,
                created_at: start + Duration::seconds(n as i64),
                time_spent_secs: Some(seed.time_spent_secs),
                explanation_viewed: Some(seed.explanation_viewed),
                user_exam_average: seed.user_exam_average,
            })
            .expect("append seed attempt");
    }
}

pub fn quiz_run(
    user_id: &str,
    exam_id: &str,
    mode: QuizMode,
    domain: Option<&str>,
    correct: u32,
    total: u32,
    completed_at: DateTime<Utc>,
) -> QuizRun {
    QuizRun {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        exam_id: exam_id.to_string(),
        mode,
        domain: domain.map(str::to_string),
        correct,
        total,
        answers: Vec::new(),
        completed_at,
    }
}
