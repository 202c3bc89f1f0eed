pub mod attempts;
pub mod domain_mastery;
pub mod items;
pub mod progress;
pub mod runs;
pub mod system_metrics;
