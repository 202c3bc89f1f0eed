use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Store, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    New,
    Learning,
    Mastered,
}

/// Per user × item learning state. A missing record means `New`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemProgress {
    pub user_id: String,
    pub item_id: String,
    pub exam_id: String,
    pub status: ProgressStatus,
    pub consecutive_correct: u32,
    pub domain: String,
    pub last_attempted: DateTime<Utc>,
}

impl Store {
    pub fn get_item_progress(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ItemProgress>, StoreError> {
        let key = keys::progress_key(user_id, item_id)?;
        match self.item_progress.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Last write wins; concurrent sessions for one user are not coordinated.
    pub fn upsert_item_progress(&self, progress: &ItemProgress) -> Result<(), StoreError> {
        let key = keys::progress_key(&progress.user_id, &progress.item_id)?;
        self.item_progress
            .insert(key.as_bytes(), Self::serialize(progress)?)?;
        Ok(())
    }

    /// Every progress record of a user keyed by item id.
    pub fn get_progress_map(&self, user_id: &str) -> Result<HashMap<String, ItemProgress>, StoreError> {
        let prefix = keys::progress_prefix(user_id)?;
        let mut map = HashMap::new();
        for entry in self.item_progress.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            let progress: ItemProgress = Self::deserialize(&value)?;
            map.insert(progress.item_id.clone(), progress);
        }
        Ok(map)
    }
}
