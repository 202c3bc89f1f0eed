pub mod complexity;
pub mod config;
pub mod engine;
pub mod mastery;
pub mod quality;
pub mod readiness;
pub mod repository;
pub mod selector;
pub mod shuffle;
pub mod types;

/// Rounds halves toward positive infinity, so -0.5 becomes 0 and 2.5 becomes 3.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
