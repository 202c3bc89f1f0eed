use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Store, StoreError};

/// One answered item. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub exam_id: String,
    /// Copied from the item when the answer was logged.
    pub domain: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub time_spent_secs: Option<f64>,
    #[serde(default)]
    pub explanation_viewed: Option<bool>,
    /// The user's running exam average when the answer was logged.
    #[serde(default)]
    pub user_exam_average: Option<f64>,
}

impl Store {
    pub fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        let key = keys::attempt_key(
            &attempt.item_id,
            attempt.created_at.timestamp_millis(),
            &attempt.id,
        )?;
        self.attempts
            .insert(key.as_bytes(), Self::serialize(attempt)?)?;
        Ok(())
    }

    /// Most recent attempts on one item, newest first.
    pub fn list_item_attempts(
        &self,
        item_id: &str,
        limit: usize,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        let prefix = keys::attempt_prefix(item_id)?;
        let mut attempts = Vec::new();
        if limit == 0 {
            return Ok(attempts);
        }
        for entry in self.attempts.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            attempts.push(Self::deserialize::<AttemptRecord>(&value)?);
            if attempts.len() >= limit {
                break;
            }
        }
        Ok(attempts)
    }

    pub fn count_item_attempts(&self, item_id: &str) -> Result<usize, StoreError> {
        let prefix = keys::attempt_prefix(item_id)?;
        let mut count = 0usize;
        for entry in self.attempts.scan_prefix(prefix.as_bytes()) {
            let _ = entry?;
            count += 1;
        }
        Ok(count)
    }
}
