use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assessment::types::Tier;
use crate::constants::DEFAULT_EXAM_ID;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorConfig {
    pub session_size_free: usize,
    pub session_size_pro: usize,
    /// Consecutive correct answers needed for `mastered`.
    pub mastery_threshold: u32,
    /// Share of the session mastered items may fill when no domain filter is set.
    pub mastered_ratio_cap: f64,
    /// Candidate items fetched for a smart session.
    pub smart_pool_cap: usize,
    pub simulation_pool_cap: usize,
    /// Domain accuracy below this marks it weak (legacy quiz).
    pub weak_domain_accuracy: f64,
    pub weak_domain_fetch_factor: usize,
    pub random_domain_count: usize,
    /// Backfill requests this multiple of the shortfall.
    pub backfill_factor: usize,
    pub diagnostic_per_domain: usize,
    pub diagnostic_fetch_per_domain: usize,
    pub diagnostic_fallback_size: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            session_size_free: 5,
            session_size_pro: 10,
            mastery_threshold: 2,
            mastered_ratio_cap: 0.30,
            smart_pool_cap: 500,
            simulation_pool_cap: 200,
            weak_domain_accuracy: 0.60,
            weak_domain_fetch_factor: 3,
            random_domain_count: 2,
            backfill_factor: 2,
            diagnostic_per_domain: 3,
            diagnostic_fetch_per_domain: 9,
            diagnostic_fallback_size: 15,
        }
    }
}

impl SelectorConfig {
    pub fn session_size(&self, tier: Tier) -> usize {
        match tier {
            Tier::Free => self.session_size_free,
            Tier::Pro => self.session_size_pro,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapConfig {
    /// Mastery score above which the pool escalates to harder items.
    pub stable_threshold: f64,
    pub pool_cap: usize,
    pub difficulty_midpoint: f64,
    pub assumed_avg_stem_len: usize,
    pub stem_length_factor: f64,
    pub min_hard_candidates: usize,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            stable_threshold: 70.0,
            pool_cap: 40,
            difficulty_midpoint: 5.0,
            assumed_avg_stem_len: 120,
            stem_length_factor: 1.5,
            min_hard_candidates: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessConfig {
    pub run_cap: usize,
    pub recent_window: usize,
    /// Percentage points recent accuracy must move before the trend changes.
    pub trend_band: f64,
    pub overall_weight: f64,
    pub recent_weight: f64,
    pub domain_insufficient_floor: u64,
    pub strong_threshold: f64,
    pub weak_threshold: f64,
    pub preliminary_floor: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            run_cap: 50,
            recent_window: 5,
            trend_band: 5.0,
            overall_weight: 0.7,
            recent_weight: 0.3,
            domain_insufficient_floor: 10,
            strong_threshold: 75.0,
            weak_threshold: 60.0,
            preliminary_floor: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityConfig {
    pub batch_size: usize,
    pub attempts_per_item: usize,
    pub sample_floor: usize,
    /// Used for responses logged without a user exam average.
    pub missing_snapshot_default: f64,
    pub memorization_max_avg_time_secs: f64,
    pub memorization_min_accuracy: f64,
    pub memorization_max_discrimination: f64,
    pub reword_below: f64,
    pub monitor_below: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            attempts_per_item: 100,
            sample_floor: 30,
            missing_snapshot_default: 70.0,
            memorization_max_avg_time_secs: 15.0,
            memorization_min_accuracy: 0.85,
            memorization_max_discrimination: 0.20,
            reword_below: 0.10,
            monitor_below: 0.30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainDefinition {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Exam id -> ordered domain list. Unknown exams resolve to `default-exam`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ExamCatalog {
    pub exams: BTreeMap<String, Vec<DomainDefinition>>,
}

fn pmp_domains() -> Vec<DomainDefinition> {
    let domain = |name: &str, weight: f64, topics: &[&str]| DomainDefinition {
        name: name.to_string(),
        weight,
        topics: topics.iter().map(|t| t.to_string()).collect(),
    };
    vec![
        domain(
            "Process",
            0.50,
            &[
                "Project Integration",
                "Scope Management",
                "Schedule",
                "Cost",
                "Quality",
                "Resources",
                "Communications",
                "Risk",
                "Procurement",
                "Stakeholders",
            ],
        ),
        domain(
            "People",
            0.42,
            &[
                "Conflict Resolution",
                "Leading a Team",
                "Supporting Team Performance",
                "Empowering Members",
                "Training",
                "Building a Team",
            ],
        ),
        domain(
            "Business Environment",
            0.08,
            &["Compliance", "Delivering Value", "Organizational Change"],
        ),
    ]
}

impl Default for ExamCatalog {
    fn default() -> Self {
        let mut exams = BTreeMap::new();
        exams.insert(DEFAULT_EXAM_ID.to_string(), pmp_domains());
        exams.insert("pmp".to_string(), pmp_domains());
        Self { exams }
    }
}

impl ExamCatalog {
    pub fn domains(&self, exam_id: &str) -> &[DomainDefinition] {
        self.exams
            .get(exam_id)
            .or_else(|| self.exams.get(DEFAULT_EXAM_ID))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn domain_names(&self, exam_id: &str) -> Vec<String> {
        self.domains(exam_id).iter().map(|d| d.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub selector: SelectorConfig,
    #[serde(default)]
    pub trap: TrapConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub exams: ExamCatalog,
}

impl EngineConfig {
    pub fn from_env(env_config: &crate::config::EngineEnvConfig) -> Self {
        let mut config = Self::default();
        config.selector.session_size_free = env_config.session_size_free;
        config.selector.session_size_pro = env_config.session_size_pro;
        config.selector.mastery_threshold = env_config.mastery_threshold;
        config.selector.mastered_ratio_cap = env_config.mastered_ratio_cap;
        config.trap.stable_threshold = env_config.trap_stable_threshold;
        config.quality.sample_floor = env_config.quality_sample_floor;
        config.quality.batch_size = env_config.quality_batch_size;
        config.readiness.recent_window = env_config.readiness_recent_window;
        config.readiness.domain_insufficient_floor = env_config.domain_insufficient_floor;

        if let Some(path) = env_config.exam_definitions_path.as_deref() {
            match load_exam_catalog(path) {
                Ok(catalog) => config.exams = catalog,
                Err(e) => {
                    tracing::warn!(path, error = %e, "Failed to load exam definitions, using built-in catalog")
                }
            }
        }

        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Engine env overrides invalid, falling back to defaults");
            return Self {
                exams: config.exams,
                ..Self::default()
            };
        }
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        let s = &self.selector;
        if s.session_size_free == 0 || s.session_size_pro == 0 {
            return Err("selector.session sizes must be > 0".to_string());
        }
        if s.mastery_threshold == 0 {
            return Err("selector.mastery_threshold must be >= 1".to_string());
        }
        if !(0.0..=1.0).contains(&s.mastered_ratio_cap) {
            return Err("selector.mastered_ratio_cap must be in [0,1]".to_string());
        }
        if !(0.0..=1.0).contains(&s.weak_domain_accuracy) {
            return Err("selector.weak_domain_accuracy must be in [0,1]".to_string());
        }
        if s.smart_pool_cap == 0 || s.simulation_pool_cap == 0 {
            return Err("selector pool caps must be > 0".to_string());
        }
        if s.weak_domain_fetch_factor == 0 || s.backfill_factor == 0 {
            return Err("selector fetch factors must be > 0".to_string());
        }
        if s.diagnostic_fetch_per_domain < s.diagnostic_per_domain {
            return Err(
                "selector.diagnostic_fetch_per_domain must be >= diagnostic_per_domain".to_string(),
            );
        }

        let t = &self.trap;
        if !(0.0..=100.0).contains(&t.stable_threshold) {
            return Err("trap.stable_threshold must be in [0,100]".to_string());
        }
        if t.pool_cap == 0 {
            return Err("trap.pool_cap must be > 0".to_string());
        }
        if !(1.0..=10.0).contains(&t.difficulty_midpoint) {
            return Err("trap.difficulty_midpoint must be in [1,10]".to_string());
        }
        if t.assumed_avg_stem_len == 0 || t.stem_length_factor <= 0.0 {
            return Err("trap stem length proxy must be positive".to_string());
        }

        let r = &self.readiness;
        if r.run_cap == 0 || r.recent_window == 0 {
            return Err("readiness.run_cap and recent_window must be > 0".to_string());
        }
        if r.recent_window > r.run_cap {
            return Err("readiness.recent_window must not exceed run_cap".to_string());
        }
        if r.trend_band < 0.0 {
            return Err("readiness.trend_band must be >= 0".to_string());
        }
        if (r.overall_weight + r.recent_weight - 1.0).abs() > 1e-6
            || r.overall_weight < 0.0
            || r.recent_weight < 0.0
        {
            return Err("readiness weights must be non-negative and sum to 1".to_string());
        }
        if r.weak_threshold > r.strong_threshold
            || !(0.0..=100.0).contains(&r.weak_threshold)
            || !(0.0..=100.0).contains(&r.strong_threshold)
        {
            return Err("readiness domain thresholds must satisfy 0 <= weak <= strong <= 100".to_string());
        }

        let q = &self.quality;
        if q.batch_size == 0 || q.attempts_per_item == 0 {
            return Err("quality.batch_size and attempts_per_item must be > 0".to_string());
        }
        if q.sample_floor == 0 {
            return Err("quality.sample_floor must be >= 1".to_string());
        }
        if q.sample_floor > q.attempts_per_item {
            return Err("quality.sample_floor must not exceed attempts_per_item".to_string());
        }
        if !(0.0..=1.0).contains(&q.memorization_min_accuracy) {
            return Err("quality.memorization_min_accuracy must be in [0,1]".to_string());
        }
        if q.reword_below > q.monitor_below {
            return Err("quality.reword_below must be <= monitor_below".to_string());
        }

        for (exam_id, domains) in &self.exams.exams {
            if domains.iter().any(|d| d.name.trim().is_empty()) {
                return Err(format!("exams.{exam_id} has a domain with an empty name"));
            }
        }

        Ok(())
    }
}

fn load_exam_catalog(path: &str) -> Result<ExamCatalog, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| e.to_string())
}
