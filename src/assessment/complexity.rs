use crate::assessment::config::TrapConfig;
use crate::store::operations::items::Item;

/// Decides whether an item counts as "hard" for trap escalation.
///
/// `None` means the estimator has no opinion and the next one in a chain
/// should be asked.
pub trait ComplexityEstimator: Send + Sync {
    fn is_complex(&self, item: &Item) -> Option<bool>;
}

/// Uses the authored 1-10 difficulty rating.
#[derive(Debug, Clone, Copy)]
pub struct ExplicitRating {
    pub midpoint: f64,
}

impl ComplexityEstimator for ExplicitRating {
    fn is_complex(&self, item: &Item) -> Option<bool> {
        item.difficulty.map(|d| d > self.midpoint)
    }
}

/// Long stems as a stand-in for difficulty when no rating exists.
#[derive(Debug, Clone, Copy)]
pub struct TextLengthProxy {
    pub assumed_avg_len: usize,
    pub factor: f64,
}

impl ComplexityEstimator for TextLengthProxy {
    fn is_complex(&self, item: &Item) -> Option<bool> {
        let len = item.stem.chars().count() as f64;
        Some(len > self.assumed_avg_len as f64 * self.factor)
    }
}

/// Asks each estimator in turn; the first answer wins.
pub struct EstimatorChain {
    estimators: Vec<Box<dyn ComplexityEstimator>>,
}

impl EstimatorChain {
    pub fn new(estimators: Vec<Box<dyn ComplexityEstimator>>) -> Self {
        Self { estimators }
    }

    /// Rating first, stem length as fallback.
    pub fn from_config(config: &TrapConfig) -> Self {
        Self::new(vec![
            Box::new(ExplicitRating {
                midpoint: config.difficulty_midpoint,
            }),
            Box::new(TextLengthProxy {
                assumed_avg_len: config.assumed_avg_stem_len,
                factor: config.stem_length_factor,
            }),
        ])
    }
}

impl ComplexityEstimator for EstimatorChain {
    fn is_complex(&self, item: &Item) -> Option<bool> {
        self.estimators.iter().find_map(|e| e.is_complex(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::operations::items::tests::sample_item;

    #[test]
    fn rating_wins_over_stem_length() {
        let chain = EstimatorChain::from_config(&TrapConfig::default());

        let mut long_but_easy = sample_item("q1", "pmp", "Process");
        long_but_easy.stem = "x".repeat(400);
        long_but_easy.difficulty = Some(3.0);
        assert_eq!(chain.is_complex(&long_but_easy), Some(false));

        let mut rated_hard = sample_item("q2", "pmp", "Process");
        rated_hard.difficulty = Some(7.0);
        assert_eq!(chain.is_complex(&rated_hard), Some(true));
    }

    #[test]
    fn midpoint_is_exclusive() {
        let rating = ExplicitRating { midpoint: 5.0 };
        let mut item = sample_item("q1", "pmp", "Process");
        item.difficulty = Some(5.0);
        assert_eq!(rating.is_complex(&item), Some(false));
    }

    #[test]
    fn unrated_items_use_stem_length() {
        let chain = EstimatorChain::from_config(&TrapConfig::default());
        let mut item = sample_item("q1", "pmp", "Process");
        item.difficulty = None;

        item.stem = "y".repeat(180);
        assert_eq!(chain.is_complex(&item), Some(false));
        item.stem = "y".repeat(181);
        assert_eq!(chain.is_complex(&item), Some(true));
    }
}
