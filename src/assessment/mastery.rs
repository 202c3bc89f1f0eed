//! Mastery state: pool partitioning and the per-answer transition.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::assessment::types::SessionPools;
use crate::store::operations::domain_mastery::DomainTally;
use crate::store::operations::items::Item;
use crate::store::operations::progress::{ItemProgress, ProgressStatus};

/// Splits candidates by progress state. Items with no record are new; any
/// recorded status other than mastered counts as learning.
pub fn classify(items: Vec<Item>, progress: &HashMap<String, ItemProgress>) -> SessionPools {
    let mut pools = SessionPools::default();
    for item in items {
        match progress.get(&item.id).map(|p| p.status) {
            None => pools.new.push(item),
            Some(ProgressStatus::Mastered) => pools.mastered.push(item),
            Some(_) => pools.learning.push(item),
        }
    }
    pools
}

/// `(status, consecutive_correct)` after one answer.
pub fn transition(consecutive_correct: u32, is_correct: bool, threshold: u32) -> (ProgressStatus, u32) {
    if !is_correct {
        return (ProgressStatus::Learning, 0);
    }
    let next = consecutive_correct.saturating_add(1);
    if next >= threshold {
        (ProgressStatus::Mastered, next)
    } else {
        (ProgressStatus::Learning, next)
    }
}

pub fn apply_answer(
    previous: Option<&ItemProgress>,
    user_id: &str,
    item: &Item,
    is_correct: bool,
    threshold: u32,
    now: DateTime<Utc>,
) -> ItemProgress {
    let counter = previous.map(|p| p.consecutive_correct).unwrap_or(0);
    let (status, consecutive_correct) = transition(counter, is_correct, threshold);
    ItemProgress {
        user_id: user_id.to_string(),
        item_id: item.id.clone(),
        exam_id: item.exam_id.clone(),
        status,
        consecutive_correct,
        domain: item.domain.clone(),
        last_attempted: now,
    }
}

/// Domains with at least one answer and accuracy below `accuracy_floor`,
/// in the aggregate's key order.
pub fn weak_domains<'a, I>(tallies: I, accuracy_floor: f64) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a DomainTally)>,
{
    tallies
        .into_iter()
        .filter(|(_, t)| t.total > 0 && (t.correct as f64 / t.total as f64) < accuracy_floor)
        .map(|(domain, _)| domain.clone())
        .collect()
}
