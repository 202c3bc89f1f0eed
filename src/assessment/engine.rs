use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::assessment::complexity::EstimatorChain;
use crate::assessment::config::EngineConfig;
use crate::assessment::mastery;
use crate::assessment::quality::{next_quality, QualityEvaluator};
use crate::assessment::readiness::ReadinessPredictor;
use crate::assessment::repository::AssessmentRepository;
use crate::assessment::selector::SessionSelector;
use crate::assessment::shuffle::{Shuffler, ThreadRngShuffler};
use crate::assessment::types::*;
use crate::constants::{MIXED_DOMAIN, QUALITY_EVALUATION_METRIC};
use crate::store::operations::attempts::AttemptRecord;
use crate::store::operations::domain_mastery::DomainTally;
use crate::store::operations::items::Item;
use crate::store::operations::progress::ItemProgress;
use crate::store::operations::runs::QuizRun;
use crate::store::StoreError;

/// Fetch, compute and write-back flows for selection, readiness and quality.
///
/// Selection never fails: store errors are logged and the session is built
/// from whatever could be read. Readiness, answer recording and quality
/// batches return store errors to the caller.
pub struct AssessmentEngine {
    config: Arc<RwLock<EngineConfig>>,
    repo: Arc<dyn AssessmentRepository>,
    shuffler: Arc<dyn Shuffler>,
}

impl AssessmentEngine {
    pub fn new(config: EngineConfig, repo: Arc<dyn AssessmentRepository>) -> Self {
        Self::with_shuffler(config, repo, Arc::new(ThreadRngShuffler))
    }

    pub fn with_shuffler(
        config: EngineConfig,
        repo: Arc<dyn AssessmentRepository>,
        shuffler: Arc<dyn Shuffler>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            repo,
            shuffler,
        }
    }

    pub async fn reload_config(&self, new_config: EngineConfig) -> Result<(), String> {
        new_config.validate()?;
        let mut cfg = self.config.write().await;
        *cfg = new_config;
        tracing::info!("Engine config reloaded");
        Ok(())
    }

    pub async fn get_config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    fn fetch_scope(&self, exam_id: &str, domain: Option<&str>, limit: usize) -> Vec<Item> {
        match self.repo.list_items_by_scope(exam_id, domain, limit) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(exam_id, domain, error = %e, "Item fetch failed, continuing without it");
                Vec::new()
            }
        }
    }

    fn simulation_from(&self, cfg: &EngineConfig, exam_id: &str, size: usize) -> Vec<Item> {
        let pool = self.fetch_scope(
            exam_id,
            None,
            cfg.selector.simulation_pool_cap.max(size),
        );
        SessionSelector::new(&cfg.selector, &cfg.trap, self.shuffler.as_ref()).simulation_set(pool, size)
    }

    /// Progress-aware practice session.
    pub async fn practice_session(&self, req: &SessionRequest) -> Vec<Item> {
        let cfg = self.get_config().await;
        let target = req.size.unwrap_or_else(|| cfg.selector.session_size(req.tier));
        let domain = req.domain.as_deref();

        let candidates = self.fetch_scope(&req.exam_id, domain, cfg.selector.smart_pool_cap);
        let progress = match self.repo.get_progress_map(&req.user_id) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(user_id = %req.user_id, error = %e, "Progress fetch failed, treating all items as new");
                Default::default()
            }
        };

        let pools = mastery::classify(candidates, &progress);
        tracing::debug!(
            user_id = %req.user_id,
            learning = pools.learning.len(),
            new = pools.new.len(),
            mastered = pools.mastered.len(),
            target,
            "Assembling practice session"
        );
        SessionSelector::new(&cfg.selector, &cfg.trap, self.shuffler.as_ref())
            .select_session(pools, target, domain)
    }

    pub async fn simulation_set(&self, exam_id: &str, size: usize) -> Vec<Item> {
        let cfg = self.get_config().await;
        self.simulation_from(&cfg, exam_id, size)
    }

    pub async fn trap_session(&self, req: &TrapSessionRequest) -> Vec<Item> {
        let cfg = self.get_config().await;
        let selector = SessionSelector::new(&cfg.selector, &cfg.trap, self.shuffler.as_ref());
        let target = req.size.unwrap_or_else(|| cfg.selector.session_size(req.tier));
        // Untagged requests have no trap pool; the whole session is backfill.
        let pool = match req.domain_tags.first() {
            Some(tag) => self.fetch_scope(&req.exam_id, Some(tag.as_str()), cfg.trap.pool_cap),
            None => Vec::new(),
        };
        let estimator = EstimatorChain::from_config(&cfg.trap);
        let candidates = selector.trap_candidates(pool, req.mastery_score, &estimator);
        let picked = selector.trap_session(candidates, target);

        if picked.len() >= target {
            return picked;
        }
        let shortfall = target - picked.len();
        let backfill = self.simulation_from(&cfg, &req.exam_id, selector.backfill_request(shortfall));
        selector.backfill(picked, backfill, target)
    }

    /// Legacy quiz aimed at the user's weakest domains.
    pub async fn weak_domain_quiz(&self, req: &WeakDomainQuizRequest) -> Vec<Item> {
        let cfg = self.get_config().await;
        let selector = SessionSelector::new(&cfg.selector, &cfg.trap, self.shuffler.as_ref());

        let aggregate = match self.repo.get_domain_mastery(&req.user_id, &req.exam_id) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(user_id = %req.user_id, error = %e, "Domain mastery fetch failed");
                None
            }
        };
        let exam_domains = cfg.exams.domain_names(&req.exam_id);
        let targets = selector.target_domains(aggregate.as_ref().map(|m| &m.domains), &exam_domains);
        let per_domain_limit = selector.per_domain_fetch(req.size, targets.len());

        let batches: Vec<Vec<Item>> = targets
            .iter()
            .map(|domain| self.fetch_scope(&req.exam_id, Some(domain), per_domain_limit))
            .collect();
        let exclude: HashSet<String> = req.exclude_ids.iter().cloned().collect();
        let mut picked = selector.weak_domain_quiz(batches, &exclude, req.size);

        if picked.len() < req.size {
            let shortfall = req.size - picked.len();
            let backfill = self.simulation_from(&cfg, &req.exam_id, selector.backfill_request(shortfall));
            picked = selector.backfill(picked, backfill, req.size);
        }
        selector.finish(picked)
    }

    /// A few items from every domain of the exam.
    pub async fn diagnostic_set(&self, exam_id: &str) -> Vec<Item> {
        let cfg = self.get_config().await;
        let domains = cfg.exams.domain_names(exam_id);
        if domains.is_empty() {
            tracing::info!(exam_id, "Exam has no domains, using a simulation set for diagnostics");
            return self.simulation_from(&cfg, exam_id, cfg.selector.diagnostic_fallback_size);
        }

        let batches: Vec<Vec<Item>> = domains
            .iter()
            .map(|domain| {
                self.fetch_scope(exam_id, Some(domain), cfg.selector.diagnostic_fetch_per_domain)
            })
            .collect();
        SessionSelector::new(&cfg.selector, &cfg.trap, self.shuffler.as_ref()).diagnostic_set(batches)
    }

    /// Applies the mastery transition and logs the attempt.
    pub async fn record_answer(&self, submission: &AnswerSubmission) -> Result<ItemProgress, StoreError> {
        let threshold = self.config.read().await.selector.mastery_threshold;

        let item = self
            .repo
            .get_item(&submission.item_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "item".to_string(),
                key: submission.item_id.clone(),
            })?;
        let previous = self
            .repo
            .get_item_progress(&submission.user_id, &submission.item_id)?;

        let now = Utc::now();
        let next = mastery::apply_answer(
            previous.as_ref(),
            &submission.user_id,
            &item,
            submission.is_correct,
            threshold,
            now,
        );
        // Log first: a failed append must not leave mastery advanced.
        self.repo.append_attempt(&AttemptRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: submission.user_id.clone(),
            item_id: item.id.clone(),
            exam_id: item.exam_id.clone(),
            domain: item.domain.clone(),
            is_correct: submission.is_correct,
            created_at: now,
            time_spent_secs: submission.time_spent_secs,
            explanation_viewed: submission.explanation_viewed,
            user_exam_average: submission.user_exam_average,
        })?;
        self.repo.upsert_item_progress(&next)?;

        tracing::debug!(
            user_id = %submission.user_id,
            item_id = %item.id,
            status = ?next.status,
            consecutive_correct = next.consecutive_correct,
            "Answer recorded"
        );
        Ok(next)
    }

    /// Stores a finished run and folds it into the per-domain aggregate.
    pub async fn record_run(&self, run: QuizRun) -> Result<QuizRun, StoreError> {
        let run = run.normalized()?;
        self.repo.create_quiz_run(&run)?;

        let deltas = run_domain_deltas(&run);
        if !deltas.is_empty() {
            self.repo
                .merge_domain_mastery(&run.user_id, &run.exam_id, &deltas)?;
        }
        tracing::info!(
            user_id = %run.user_id,
            exam_id = %run.exam_id,
            mode = ?run.mode,
            correct = run.correct,
            total = run.total,
            "Quiz run recorded"
        );
        Ok(run)
    }

    pub async fn readiness(&self, user_id: &str, exam_id: &str) -> Result<ReadinessReport, StoreError> {
        let cfg = self.get_config().await;
        let runs = self
            .repo
            .list_recent_runs(user_id, exam_id, cfg.readiness.run_cap)?;
        let expected = cfg.exams.domain_names(exam_id);
        Ok(ReadinessPredictor::new(&cfg.readiness).compute(exam_id, &runs, &expected))
    }

    /// One pass over the stalest items. Item writes are independent: a failed
    /// write is counted and the batch moves on.
    pub async fn evaluate_batch(&self) -> Result<QualitySummary, StoreError> {
        let cfg = self.get_config().await;
        let evaluator = QualityEvaluator::new(&cfg.quality);
        let items = self.repo.list_items_for_evaluation(cfg.quality.batch_size)?;

        let mut summary = QualitySummary::default();
        for item in items {
            let attempts = self
                .repo
                .list_item_attempts(&item.id, cfg.quality.attempts_per_item)?;
            let assessment = evaluator.evaluate(&attempts);
            let quality = next_quality(item.quality.as_ref(), &assessment, Utc::now());

            summary.processed += 1;
            summary.count(assessment.status);
            if let Err(e) = self.repo.set_item_quality(&item.id, &quality) {
                summary.write_failures += 1;
                tracing::error!(item_id = %item.id, error = %e, "Failed to persist item quality");
            }
        }

        match serde_json::to_value(&summary) {
            Ok(payload) => {
                if let Err(e) = self.repo.record_system_metric(QUALITY_EVALUATION_METRIC, payload) {
                    tracing::error!(error = %e, "Failed to record quality evaluation metric");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to serialize quality summary"),
        }

        tracing::info!(
            processed = summary.processed,
            needs_variant = summary.needs_variant,
            needs_reword = summary.needs_reword,
            write_failures = summary.write_failures,
            "Quality evaluation complete"
        );
        Ok(summary)
    }
}

fn run_domain_deltas(run: &QuizRun) -> BTreeMap<String, DomainTally> {
    let mut deltas: BTreeMap<String, DomainTally> = BTreeMap::new();
    if run.answers.is_empty() {
        if let Some(domain) = run
            .domain
            .as_deref()
            .filter(|d| !d.is_empty() && *d != MIXED_DOMAIN)
        {
            deltas.insert(
                domain.to_string(),
                DomainTally {
                    correct: u64::from(run.correct),
                    total: u64::from(run.total),
                },
            );
        }
        return deltas;
    }
    for answer in &run.answers {
        let Some(domain) = answer.domain.as_deref().filter(|d| !d.is_empty()) else {
            continue;
        };
        let tally = deltas.entry(domain.to_string()).or_default();
        tally.total += 1;
        tally.correct += u64::from(answer.is_correct);
    }
    deltas
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Duration;

    use super::*;
    use crate::assessment::shuffle::IdentityShuffler;
    use crate::store::operations::attempts::tests::sample_attempt;
    use crate::store::operations::items::tests::sample_item;
    use crate::store::operations::items::ItemQuality;
    use crate::store::operations::progress::ProgressStatus;
    use crate::store::operations::runs::{QuizMode, RunAnswer};
    use crate::store::operations::domain_mastery::DomainMastery;
    use crate::store::Store;

    fn temp_store() -> (tempfile::TempDir, Arc<Store>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("engine-db").to_str().unwrap()).unwrap());
        (dir, store)
    }

    fn engine(store: Arc<Store>) -> AssessmentEngine {
        AssessmentEngine::with_shuffler(EngineConfig::default(), store, Arc::new(IdentityShuffler))
    }

    fn seed(store: &Store, prefix: &str, domain: &str, n: usize) {
        for i in 0..n {
            store
                .upsert_item(&sample_item(&format!("{prefix}{i}"), "pmp", domain))
                .unwrap();
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Validation("store unavailable".to_string())
    }

    /// Every call fails.
    struct BrokenRepository;

    impl AssessmentRepository for BrokenRepository {
        fn list_items_by_scope(&self, _: &str, _: Option<&str>, _: usize) -> Result<Vec<Item>, StoreError> {
            Err(unavailable())
        }
        fn get_item(&self, _: &str) -> Result<Option<Item>, StoreError> {
            Err(unavailable())
        }
        fn list_items_for_evaluation(&self, _: usize) -> Result<Vec<Item>, StoreError> {
            Err(unavailable())
        }
        fn set_item_quality(&self, _: &str, _: &ItemQuality) -> Result<Item, StoreError> {
            Err(unavailable())
        }
        fn get_progress_map(&self, _: &str) -> Result<HashMap<String, ItemProgress>, StoreError> {
            Err(unavailable())
        }
        fn get_item_progress(&self, _: &str, _: &str) -> Result<Option<ItemProgress>, StoreError> {
            Err(unavailable())
        }
        fn upsert_item_progress(&self, _: &ItemProgress) -> Result<(), StoreError> {
            Err(unavailable())
        }
        fn append_attempt(&self, _: &AttemptRecord) -> Result<(), StoreError> {
            Err(unavailable())
        }
        fn list_item_attempts(&self, _: &str, _: usize) -> Result<Vec<AttemptRecord>, StoreError> {
            Err(unavailable())
        }
        fn create_quiz_run(&self, _: &QuizRun) -> Result<(), StoreError> {
            Err(unavailable())
        }
        fn list_recent_runs(&self, _: &str, _: &str, _: usize) -> Result<Vec<QuizRun>, StoreError> {
            Err(unavailable())
        }
        fn get_domain_mastery(&self, _: &str, _: &str) -> Result<Option<DomainMastery>, StoreError> {
            Err(unavailable())
        }
        fn merge_domain_mastery(
            &self,
            _: &str,
            _: &str,
            _: &BTreeMap<String, DomainTally>,
        ) -> Result<DomainMastery, StoreError> {
            Err(unavailable())
        }
        fn record_system_metric(&self, _: &str, _: serde_json::Value) -> Result<(), StoreError> {
            Err(unavailable())
        }
    }

    /// Reads from a real store, refuses quality writes for one item.
    struct FlakyWrites {
        inner: Arc<Store>,
        reject: String,
    }

    impl AssessmentRepository for FlakyWrites {
        fn list_items_by_scope(&self, e: &str, d: Option<&str>, l: usize) -> Result<Vec<Item>, StoreError> {
            self.inner.list_items_by_scope(e, d, l)
        }
        fn get_item(&self, id: &str) -> Result<Option<Item>, StoreError> {
            self.inner.get_item(id)
        }
        fn list_items_for_evaluation(&self, l: usize) -> Result<Vec<Item>, StoreError> {
            self.inner.list_items_for_evaluation(l)
        }
        fn set_item_quality(&self, id: &str, q: &ItemQuality) -> Result<Item, StoreError> {
            if id == self.reject {
                return Err(unavailable());
            }
            self.inner.set_item_quality(id, q)
        }
        fn get_progress_map(&self, u: &str) -> Result<HashMap<String, ItemProgress>, StoreError> {
            self.inner.get_progress_map(u)
        }
        fn get_item_progress(&self, u: &str, i: &str) -> Result<Option<ItemProgress>, StoreError> {
            self.inner.get_item_progress(u, i)
        }
        fn upsert_item_progress(&self, p: &ItemProgress) -> Result<(), StoreError> {
            self.inner.upsert_item_progress(p)
        }
        fn append_attempt(&self, a: &AttemptRecord) -> Result<(), StoreError> {
            self.inner.append_attempt(a)
        }
        fn list_item_attempts(&self, i: &str, l: usize) -> Result<Vec<AttemptRecord>, StoreError> {
            self.inner.list_item_attempts(i, l)
        }
        fn create_quiz_run(&self, r: &QuizRun) -> Result<(), StoreError> {
            self.inner.create_quiz_run(r)
        }
        fn list_recent_runs(&self, u: &str, e: &str, l: usize) -> Result<Vec<QuizRun>, StoreError> {
            self.inner.list_recent_runs(u, e, l)
        }
        fn get_domain_mastery(&self, u: &str, e: &str) -> Result<Option<DomainMastery>, StoreError> {
            self.inner.get_domain_mastery(u, e)
        }
        fn merge_domain_mastery(
            &self,
            u: &str,
            e: &str,
            d: &BTreeMap<String, DomainTally>,
        ) -> Result<DomainMastery, StoreError> {
            self.inner.merge_domain_mastery(u, e, d)
        }
        fn record_system_metric(&self, k: &str, p: serde_json::Value) -> Result<(), StoreError> {
            AssessmentRepository::record_system_metric(self.inner.as_ref(), k, p)
        }
    }

    fn session_request(size: Option<usize>, domain: Option<&str>) -> SessionRequest {
        SessionRequest {
            user_id: "u1".to_string(),
            exam_id: "pmp".to_string(),
            tier: Tier::Free,
            size,
            domain: domain.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn selection_degrades_to_empty_on_store_failure() {
        let engine = AssessmentEngine::new(EngineConfig::default(), Arc::new(BrokenRepository));

        assert!(engine.practice_session(&session_request(None, None)).await.is_empty());
        assert!(engine.simulation_set("pmp", 10).await.is_empty());
        assert!(engine.diagnostic_set("pmp").await.is_empty());
        let trap = TrapSessionRequest {
            exam_id: "pmp".to_string(),
            domain_tags: vec!["People".to_string()],
            mastery_score: 90.0,
            tier: Tier::Pro,
            size: None,
        };
        assert!(engine.trap_session(&trap).await.is_empty());
    }

    #[tokio::test]
    async fn reports_surface_store_failures() {
        let engine = AssessmentEngine::new(EngineConfig::default(), Arc::new(BrokenRepository));
        assert!(engine.readiness("u1", "pmp").await.is_err());
        assert!(engine.evaluate_batch().await.is_err());
    }

    #[tokio::test]
    async fn practice_session_prefers_learning_items() {
        let (_dir, store) = temp_store();
        seed(&store, "q", "People", 8);
        let engine = engine(store.clone());

        for id in ["q5", "q6", "q7"] {
            engine
                .record_answer(&AnswerSubmission {
                    user_id: "u1".to_string(),
                    item_id: id.to_string(),
                    is_correct: false,
                    time_spent_secs: Some(12.0),
                    explanation_viewed: None,
                    user_exam_average: None,
                })
                .await
                .unwrap();
        }

        let session = engine.practice_session(&session_request(Some(3), None)).await;
        let ids: HashSet<String> = session.into_iter().map(|i| i.id).collect();
        let expected: HashSet<String> = ["q5", "q6", "q7"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn record_answer_walks_the_mastery_transition() {
        let (_dir, store) = temp_store();
        seed(&store, "q", "Process", 1);
        let engine = engine(store.clone());

        let answer = |is_correct| AnswerSubmission {
            user_id: "u1".to_string(),
            item_id: "q0".to_string(),
            is_correct,
            time_spent_secs: None,
            explanation_viewed: Some(true),
            user_exam_average: Some(72.0),
        };

        let first = engine.record_answer(&answer(true)).await.unwrap();
        assert_eq!((first.status, first.consecutive_correct), (ProgressStatus::Learning, 1));
        let second = engine.record_answer(&answer(true)).await.unwrap();
        assert_eq!(second.status, ProgressStatus::Mastered);
        let third = engine.record_answer(&answer(false)).await.unwrap();
        assert_eq!((third.status, third.consecutive_correct), (ProgressStatus::Learning, 0));

        assert_eq!(store.count_item_attempts("q0").unwrap(), 3);
        let missing = engine
            .record_answer(&AnswerSubmission {
                item_id: "nope".to_string(),
                ..answer(true)
            })
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn trap_session_backfills_from_simulation_pool() {
        let (_dir, store) = temp_store();
        seed(&store, "p", "People", 2);
        seed(&store, "r", "Process", 10);
        let engine = engine(store.clone());

        let req = TrapSessionRequest {
            exam_id: "pmp".to_string(),
            domain_tags: vec!["People".to_string()],
            mastery_score: 10.0,
            tier: Tier::Free,
            size: Some(6),
        };
        let session = engine.trap_session(&req).await;
        let ids: HashSet<&str> = session.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(session.len(), 6);
        assert_eq!(ids.len(), 6);
        assert!(ids.contains("p0") && ids.contains("p1"));
    }

    #[tokio::test]
    async fn untagged_trap_session_is_all_simulation_backfill() {
        let (_dir, store) = temp_store();
        seed(&store, "p", "People", 4);
        seed(&store, "r", "Process", 4);
        let engine = engine(store.clone());

        let req = TrapSessionRequest {
            exam_id: "pmp".to_string(),
            domain_tags: vec![],
            mastery_score: 95.0,
            tier: Tier::Free,
            size: Some(5),
        };
        let session = engine.trap_session(&req).await;
        let ids: HashSet<&str> = session.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(session.len(), 5);
        assert_eq!(ids.len(), 5);
    }

    /// Real store, but the attempt log refuses appends.
    struct ReadOnlyLog {
        inner: Arc<Store>,
    }

    impl AssessmentRepository for ReadOnlyLog {
        fn list_items_by_scope(&self, e: &str, d: Option<&str>, l: usize) -> Result<Vec<Item>, StoreError> {
            self.inner.list_items_by_scope(e, d, l)
        }
        fn get_item(&self, id: &str) -> Result<Option<Item>, StoreError> {
            self.inner.get_item(id)
        }
        fn list_items_for_evaluation(&self, l: usize) -> Result<Vec<Item>, StoreError> {
            self.inner.list_items_for_evaluation(l)
        }
        fn set_item_quality(&self, id: &str, q: &ItemQuality) -> Result<Item, StoreError> {
            self.inner.set_item_quality(id, q)
        }
        fn get_progress_map(&self, u: &str) -> Result<HashMap<String, ItemProgress>, StoreError> {
            self.inner.get_progress_map(u)
        }
        fn get_item_progress(&self, u: &str, i: &str) -> Result<Option<ItemProgress>, StoreError> {
            self.inner.get_item_progress(u, i)
        }
        fn upsert_item_progress(&self, p: &ItemProgress) -> Result<(), StoreError> {
            self.inner.upsert_item_progress(p)
        }
        fn append_attempt(&self, _: &AttemptRecord) -> Result<(), StoreError> {
            Err(unavailable())
        }
        fn list_item_attempts(&self, i: &str, l: usize) -> Result<Vec<AttemptRecord>, StoreError> {
            self.inner.list_item_attempts(i, l)
        }
        fn create_quiz_run(&self, r: &QuizRun) -> Result<(), StoreError> {
            self.inner.create_quiz_run(r)
        }
        fn list_recent_runs(&self, u: &str, e: &str, l: usize) -> Result<Vec<QuizRun>, StoreError> {
            self.inner.list_recent_runs(u, e, l)
        }
        fn get_domain_mastery(&self, u: &str, e: &str) -> Result<Option<DomainMastery>, StoreError> {
            self.inner.get_domain_mastery(u, e)
        }
        fn merge_domain_mastery(
            &self,
            u: &str,
            e: &str,
            d: &BTreeMap<String, DomainTally>,
        ) -> Result<DomainMastery, StoreError> {
            self.inner.merge_domain_mastery(u, e, d)
        }
        fn record_system_metric(&self, k: &str, p: serde_json::Value) -> Result<(), StoreError> {
            AssessmentRepository::record_system_metric(self.inner.as_ref(), k, p)
        }
    }

    #[tokio::test]
    async fn failed_attempt_append_leaves_progress_untouched() {
        let (_dir, store) = temp_store();
        seed(&store, "q", "People", 1);
        let engine = AssessmentEngine::new(
            EngineConfig::default(),
            Arc::new(ReadOnlyLog { inner: store.clone() }),
        );

        let result = engine
            .record_answer(&AnswerSubmission {
                user_id: "u1".to_string(),
                item_id: "q0".to_string(),
                is_correct: true,
                time_spent_secs: None,
                explanation_viewed: None,
                user_exam_average: None,
            })
            .await;
        assert!(result.is_err());
        assert!(store.get_item_progress("u1", "q0").unwrap().is_none());
    }

    #[tokio::test]
    async fn overflowing_snapshots_never_corrupt_the_item() {
        let (_dir, store) = temp_store();
        seed(&store, "q", "People", 1);
        let now = Utc::now();
        for i in 0..30 {
            let mut a = sample_attempt(&format!("a{i}"), "q0", i % 2 == 0, now - Duration::seconds(i));
            a.user_exam_average = Some(1e308);
            store.append_attempt(&a).unwrap();
        }
        let engine = engine(store.clone());

        let first = engine.evaluate_batch().await.unwrap();
        assert_eq!((first.processed, first.write_failures), (1, 0));
        let second = engine.evaluate_batch().await.unwrap();
        assert_eq!(second.processed, 1);

        let quality = store.get_item("q0").unwrap().unwrap().quality.unwrap();
        let metrics = quality.metrics.unwrap();
        assert_eq!(metrics.discrimination_index, 0.0);
        assert_eq!(quality.quality_score, Some(0));
        assert_eq!(
            engine.practice_session(&session_request(Some(1), None)).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn weak_domain_quiz_targets_low_accuracy_domains() {
        let (_dir, store) = temp_store();
        seed(&store, "p", "People", 10);
        seed(&store, "r", "Process", 10);
        let engine = engine(store.clone());

        let mut deltas = BTreeMap::new();
        deltas.insert("People".to_string(), DomainTally { correct: 2, total: 10 });
        deltas.insert("Process".to_string(), DomainTally { correct: 9, total: 10 });
        store.merge_domain_mastery("u1", "pmp", &deltas).unwrap();

        let quiz = engine
            .weak_domain_quiz(&WeakDomainQuizRequest {
                user_id: "u1".to_string(),
                exam_id: "pmp".to_string(),
                size: 4,
                exclude_ids: vec!["p0".to_string()],
            })
            .await;
        assert_eq!(quiz.len(), 4);
        assert!(quiz.iter().all(|i| i.domain == "People" && i.id != "p0"));
    }

    #[tokio::test]
    async fn diagnostic_set_covers_every_domain() {
        let (_dir, store) = temp_store();
        seed(&store, "a", "Process", 5);
        seed(&store, "b", "People", 5);
        seed(&store, "c", "Business Environment", 1);
        let engine = engine(store.clone());

        let set = engine.diagnostic_set("pmp").await;
        assert_eq!(set.len(), 7);
        assert_eq!(set.iter().filter(|i| i.domain == "Business Environment").count(), 1);
    }

    #[tokio::test]
    async fn recorded_runs_feed_readiness_and_mastery() {
        let (_dir, store) = temp_store();
        let engine = engine(store.clone());

        let answers: Vec<RunAnswer> = (0..10)
            .map(|i| RunAnswer {
                item_id: format!("q{i}"),
                domain: Some("People".to_string()),
                is_correct: i < 8,
            })
            .collect();
        let run = QuizRun {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            exam_id: "pmp".to_string(),
            mode: QuizMode::Simulation,
            domain: None,
            correct: 0,
            total: 0,
            answers,
            completed_at: Utc::now() - Duration::minutes(1),
        };
        let stored = engine.record_run(run).await.unwrap();
        assert_eq!((stored.correct, stored.total), (8, 10));

        let mastery = store.get_domain_mastery("u1", "pmp").unwrap().unwrap();
        assert_eq!(mastery.domains["People"], DomainTally { correct: 8, total: 10 });

        let report = engine.readiness("u1", "pmp").await.unwrap();
        assert_eq!(report.overall_score, Some(80));
        assert_eq!(report.mock_exams_taken, 1);
        assert_eq!(report.domains.len(), 3);
        assert!(report.is_preliminary);
    }

    #[tokio::test]
    async fn quality_batch_continues_past_failed_writes() {
        let (_dir, store) = temp_store();
        seed(&store, "q", "People", 3);
        let now = Utc::now();
        for i in 0..40 {
            let mut a = sample_attempt(&format!("a{i}"), "q0", i % 2 == 0, now - Duration::seconds(i));
            a.user_exam_average = Some(if i % 2 == 0 { 90.0 } else { 50.0 });
            store.append_attempt(&a).unwrap();
        }

        let repo = Arc::new(FlakyWrites {
            inner: store.clone(),
            reject: "q1".to_string(),
        });
        let engine = AssessmentEngine::new(EngineConfig::default(), repo);
        let summary = engine.evaluate_batch().await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.insufficient_data, 2);
        assert_eq!(summary.stable, 1);
        assert_eq!(summary.write_failures, 1);

        let q0 = store.get_item("q0").unwrap().unwrap();
        let quality = q0.quality.unwrap();
        assert_eq!(quality.quality_status, QualityStatus::Stable);
        assert_eq!(quality.quality_score, Some(100));
        assert!(store.get_item("q1").unwrap().unwrap().quality.is_none());
        assert_eq!(store.list_system_metrics(QUALITY_EVALUATION_METRIC, 5).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reload_rejects_invalid_config() {
        let (_dir, store) = temp_store();
        let engine = engine(store);

        let mut bad = EngineConfig::default();
        bad.selector.mastered_ratio_cap = 3.0;
        assert!(engine.reload_config(bad).await.is_err());

        let mut good = EngineConfig::default();
        good.selector.session_size_free = 8;
        engine.reload_config(good).await.unwrap();
        assert_eq!(engine.get_config().await.selector.session_size_free, 8);
    }
}
