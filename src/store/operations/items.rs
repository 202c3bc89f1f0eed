use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::assessment::types::{QualityMetrics, QualityStatus};
use crate::constants::{DEFAULT_EXAM_ID, MAX_CAS_RETRIES};
use crate::store::{keys, map_tx_error, Store, StoreError};

fn default_exam_id() -> String {
    DEFAULT_EXAM_ID.to_string()
}

/// A single exam question. Content fields are authored externally; `quality`
/// is owned by the quality evaluator and survives content upserts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default = "default_exam_id")]
    pub exam_id: String,
    pub stem: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: String,
    pub domain: String,
    /// 1-10 when rated.
    #[serde(default)]
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub quality: Option<ItemQuality>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuality {
    pub quality_score: Option<i64>,
    pub quality_status: QualityStatus,
    pub metrics: Option<QualityMetrics>,
    pub last_evaluated: DateTime<Utc>,
}

impl Item {
    pub fn last_evaluated(&self) -> Option<DateTime<Utc>> {
        self.quality.as_ref().map(|q| q.last_evaluated)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.options.len() < 2 {
            return Err(StoreError::Validation(
                "item needs at least two options".to_string(),
            ));
        }
        if self.correct_index >= self.options.len() {
            return Err(StoreError::Validation(format!(
                "correctIndex {} out of range for {} options",
                self.correct_index,
                self.options.len()
            )));
        }
        if let Some(difficulty) = self.difficulty {
            if !(1.0..=10.0).contains(&difficulty) {
                return Err(StoreError::Validation(
                    "difficulty must be in [1,10]".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Store {
    pub fn upsert_item(&self, item: &Item) -> Result<Item, StoreError> {
        item.validate()?;
        let key = keys::item_key(&item.id)?;
        let scope_key = keys::item_scope_key(&item.exam_id, &item.domain, &item.id)?;

        let stored = (&self.items, &self.items_by_scope)
            .transaction(|(tx_items, tx_scope)| {
                let mut next = item.clone();
                if let Some(old_raw) = tx_items.get(key.as_bytes())? {
                    let old: Item = serde_json::from_slice(&old_raw).map_err(|error| {
                        sled::transaction::ConflictableTransactionError::Abort(
                            StoreError::Serialization(error),
                        )
                    })?;
                    let old_scope_key = keys::item_scope_key(&old.exam_id, &old.domain, &old.id)
                        .map_err(sled::transaction::ConflictableTransactionError::Abort)?;
                    if old_scope_key != scope_key {
                        tx_scope.remove(old_scope_key.as_bytes())?;
                    }
                    next.quality = old.quality;
                    next.created_at = old.created_at;
                }

                let bytes = serde_json::to_vec(&next).map_err(|error| {
                    sled::transaction::ConflictableTransactionError::Abort(
                        StoreError::Serialization(error),
                    )
                })?;
                tx_items.insert(key.as_bytes(), bytes)?;
                tx_scope.insert(scope_key.as_bytes(), &[])?;
                Ok(next)
            })
            .map_err(map_tx_error)?;

        Ok(stored)
    }

    pub fn get_item(&self, item_id: &str) -> Result<Option<Item>, StoreError> {
        let key = keys::item_key(item_id)?;
        match self.items.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Items of one exam, optionally narrowed to a domain, in index order.
    pub fn list_items_by_scope(
        &self,
        exam_id: &str,
        domain: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Item>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = keys::item_scope_prefix(exam_id, domain)?;
        let mut items = Vec::new();
        for entry in self.items_by_scope.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            let Some(item_id) = keys::parse_item_scope_key(&key) else {
                continue;
            };
            // Index entries can briefly outlive their item; skip those.
            if let Some(item) = self.get_item(&item_id)? {
                items.push(item);
                if items.len() >= limit {
                    break;
                }
            }
        }
        Ok(items)
    }

    /// Items ordered by staleness of their quality record, never-evaluated first.
    pub fn list_items_for_evaluation(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        for entry in self.items.iter() {
            let (_, value) = entry?;
            items.push(Self::deserialize::<Item>(&value)?);
        }
        items.sort_by(|a, b| {
            a.last_evaluated()
                .cmp(&b.last_evaluated())
                .then_with(|| a.id.cmp(&b.id))
        });
        items.truncate(limit);
        Ok(items)
    }

    pub fn count_items(&self) -> usize {
        self.items.len()
    }

    /// Replaces the quality record of an item without touching its content.
    pub fn set_item_quality(&self, item_id: &str, quality: &ItemQuality) -> Result<Item, StoreError> {
        let key = keys::item_key(item_id)?;

        for _ in 0..MAX_CAS_RETRIES {
            let Some(current_raw) = self.items.get(key.as_bytes())? else {
                return Err(StoreError::NotFound {
                    entity: "item".to_string(),
                    key,
                });
            };
            let mut item: Item = Self::deserialize(&current_raw)?;
            item.quality = Some(quality.clone());
            let next = Self::serialize(&item)?;

            if self
                .items
                .compare_and_swap(key.as_bytes(), Some(current_raw), Some(next))?
                .is_ok()
            {
                return Ok(item);
            }
        }

        Err(StoreError::CasRetryExhausted {
            entity: "item".to_string(),
            key,
            attempts: MAX_CAS_RETRIES,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::tempdir;

    use super::*;

    pub(crate) fn sample_item(id: &str, exam_id: &str, domain: &str) -> Item {
        Item {
            id: id.to_string(),
            exam_id: exam_id.to_string(),
            stem: format!("Stem for {id}"),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()],
            correct_index: 1,
            explanation: "Because B".to_string(),
            domain: domain.to_string(),
            difficulty: None,
            quality: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn scope_listing_filters_by_exam_and_domain() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("items-db").to_str().unwrap()).unwrap();

        store.upsert_item(&sample_item("q1", "pmp", "People")).unwrap();
        store.upsert_item(&sample_item("q2", "pmp", "Process")).unwrap();
        store.upsert_item(&sample_item("q3", "capm", "People")).unwrap();

        let pmp = store.list_items_by_scope("pmp", None, 10).unwrap();
        assert_eq!(pmp.len(), 2);

        let people = store.list_items_by_scope("pmp", Some("People"), 10).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id, "q1");

        assert_eq!(store.list_items_by_scope("pmp", None, 1).unwrap().len(), 1);
    }

    #[test]
    fn moving_an_item_between_domains_updates_the_index() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("items-move").to_str().unwrap()).unwrap();

        store.upsert_item(&sample_item("q1", "pmp", "People")).unwrap();
        store.upsert_item(&sample_item("q1", "pmp", "Process")).unwrap();

        assert!(store
            .list_items_by_scope("pmp", Some("People"), 10)
            .unwrap()
            .is_empty());
        assert_eq!(
            store.list_items_by_scope("pmp", Some("Process"), 10).unwrap().len(),
            1
        );
    }

    #[test]
    fn upsert_preserves_quality_record() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("items-quality").to_str().unwrap()).unwrap();

        store.upsert_item(&sample_item("q1", "pmp", "People")).unwrap();
        let quality = ItemQuality {
            quality_score: Some(42),
            quality_status: QualityStatus::Stable,
            metrics: None,
            last_evaluated: Utc::now(),
        };
        store.set_item_quality("q1", &quality).unwrap();

        let mut edited = sample_item("q1", "pmp", "People");
        edited.stem = "Reworded stem".to_string();
        store.upsert_item(&edited).unwrap();

        let stored = store.get_item("q1").unwrap().unwrap();
        assert_eq!(stored.stem, "Reworded stem");
        assert_eq!(stored.quality, Some(quality));
    }

    #[test]
    fn evaluation_order_puts_never_evaluated_first() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("items-eval").to_str().unwrap()).unwrap();

        store.upsert_item(&sample_item("q1", "pmp", "People")).unwrap();
        store.upsert_item(&sample_item("q2", "pmp", "People")).unwrap();
        store
            .set_item_quality(
                "q1",
                &ItemQuality {
                    quality_score: None,
                    quality_status: QualityStatus::InsufficientData,
                    metrics: None,
                    last_evaluated: Utc::now(),
                },
            )
            .unwrap();

        let batch = store.list_items_for_evaluation(1).unwrap();
        assert_eq!(batch[0].id, "q2");
    }

    #[test]
    fn invalid_items_are_rejected() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("items-invalid").to_str().unwrap()).unwrap();

        let mut item = sample_item("q1", "pmp", "People");
        item.correct_index = 9;
        assert!(matches!(
            store.upsert_item(&item),
            Err(StoreError::Validation(_))
        ));

        let mut item = sample_item("q2", "pmp", "People");
        item.difficulty = Some(11.0);
        assert!(store.upsert_item(&item).is_err());
    }

    #[test]
    fn quality_update_on_missing_item_is_not_found() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("items-missing").to_str().unwrap()).unwrap();
        let err = store
            .set_item_quality(
                "ghost",
                &ItemQuality {
                    quality_score: None,
                    quality_status: QualityStatus::InsufficientData,
                    metrics: None,
                    last_evaluated: Utc::now(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
