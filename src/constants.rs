/// Maximum retries for compare-and-swap updates
pub const MAX_CAS_RETRIES: u32 = 20;

/// Exam scope used when a request or record names none; also the catalog fallback
pub const DEFAULT_EXAM_ID: &str = "default-exam";

/// Session-level domain tag meaning "more than one domain"
pub const MIXED_DOMAIN: &str = "Mixed";

/// System-metrics kind written after each quality batch
pub const QUALITY_EVALUATION_METRIC: &str = "quality_evaluation";

/// Upper bound for any list request coming over HTTP
pub const MAX_REQUEST_SIZE: usize = 200;
