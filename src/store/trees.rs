pub const ITEMS: &str = "items";
pub const ITEMS_BY_SCOPE: &str = "items_by_scope";
pub const ATTEMPTS: &str = "attempts";
pub const ITEM_PROGRESS: &str = "item_progress";
pub const QUIZ_RUNS: &str = "quiz_runs";
pub const DOMAIN_MASTERY: &str = "domain_mastery";
pub const SYSTEM_METRICS: &str = "system_metrics";
pub const CONFIG_VERSIONS: &str = "config_versions";
