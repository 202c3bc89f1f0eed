use std::collections::{BTreeMap, HashMap};

use crate::store::operations::attempts::AttemptRecord;
use crate::store::operations::domain_mastery::{DomainMastery, DomainTally};
use crate::store::operations::items::{Item, ItemQuality};
use crate::store::operations::progress::ItemProgress;
use crate::store::operations::runs::QuizRun;
use crate::store::{Store, StoreError};

/// Reads and writes the engine needs from the document store.
pub trait AssessmentRepository: Send + Sync {
    fn list_items_by_scope(
        &self,
        exam_id: &str,
        domain: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Item>, StoreError>;

    fn get_item(&self, item_id: &str) -> Result<Option<Item>, StoreError>;

    fn list_items_for_evaluation(&self, limit: usize) -> Result<Vec<Item>, StoreError>;

    fn set_item_quality(&self, item_id: &str, quality: &ItemQuality) -> Result<Item, StoreError>;

    fn get_progress_map(&self, user_id: &str) -> Result<HashMap<String, ItemProgress>, StoreError>;

    fn get_item_progress(&self, user_id: &str, item_id: &str) -> Result<Option<ItemProgress>, StoreError>;

    fn upsert_item_progress(&self, progress: &ItemProgress) -> Result<(), StoreError>;

    fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError>;

    fn list_item_attempts(&self, item_id: &str, limit: usize) -> Result<Vec<AttemptRecord>, StoreError>;

    fn create_quiz_run(&self, run: &QuizRun) -> Result<(), StoreError>;

    fn list_recent_runs(&self, user_id: &str, exam_id: &str, limit: usize) -> Result<Vec<QuizRun>, StoreError>;

    fn get_domain_mastery(&self, user_id: &str, exam_id: &str) -> Result<Option<DomainMastery>, StoreError>;

    fn merge_domain_mastery(
        &self,
        user_id: &str,
        exam_id: &str,
        deltas: &BTreeMap<String, DomainTally>,
    ) -> Result<DomainMastery, StoreError>;

    fn record_system_metric(&self, kind: &str, payload: serde_json::Value) -> Result<(), StoreError>;
}

impl AssessmentRepository for Store {
    fn list_items_by_scope(
        &self,
        exam_id: &str,
        domain: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Item>, StoreError> {
        Store::list_items_by_scope(self, exam_id, domain, limit)
    }

    fn get_item(&self, item_id: &str) -> Result<Option<Item>, StoreError> {
        Store::get_item(self, item_id)
    }

    fn list_items_for_evaluation(&self, limit: usize) -> Result<Vec<Item>, StoreError> {
        Store::list_items_for_evaluation(self, limit)
    }

    fn set_item_quality(&self, item_id: &str, quality: &ItemQuality) -> Result<Item, StoreError> {
        Store::set_item_quality(self, item_id, quality)
    }

    fn get_progress_map(&self, user_id: &str) -> Result<HashMap<String, ItemProgress>, StoreError> {
        Store::get_progress_map(self, user_id)
    }

    fn get_item_progress(&self, user_id: &str, item_id: &str) -> Result<Option<ItemProgress>, StoreError> {
        Store::get_item_progress(self, user_id, item_id)
    }

    fn upsert_item_progress(&self, progress: &ItemProgress) -> Result<(), StoreError> {
        Store::upsert_item_progress(self, progress)
    }

    fn append_attempt(&self, attempt: &AttemptRecord) -> Result<(), StoreError> {
        Store::append_attempt(self, attempt)
    }

    fn list_item_attempts(&self, item_id: &str, limit: usize) -> Result<Vec<AttemptRecord>, StoreError> {
        Store::list_item_attempts(self, item_id, limit)
    }

    fn create_quiz_run(&self, run: &QuizRun) -> Result<(), StoreError> {
        Store::create_quiz_run(self, run)
    }

    fn list_recent_runs(&self, user_id: &str, exam_id: &str, limit: usize) -> Result<Vec<QuizRun>, StoreError> {
        Store::list_recent_runs(self, user_id, exam_id, limit)
    }

    fn get_domain_mastery(&self, user_id: &str, exam_id: &str) -> Result<Option<DomainMastery>, StoreError> {
        Store::get_domain_mastery(self, user_id, exam_id)
    }

    fn merge_domain_mastery(
        &self,
        user_id: &str,
        exam_id: &str,
        deltas: &BTreeMap<String, DomainTally>,
    ) -> Result<DomainMastery, StoreError> {
        Store::merge_domain_mastery(self, user_id, exam_id, deltas)
    }

    fn record_system_metric(&self, kind: &str, payload: serde_json::Value) -> Result<(), StoreError> {
        Store::record_system_metric(self, kind, payload).map(|_| ())
    }
}
