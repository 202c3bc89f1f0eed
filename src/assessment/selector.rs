//! Session assembly over already-fetched candidate pools. Nothing here touches
//! the store; the engine does the fetching and hands the pools in.

use std::collections::{BTreeMap, HashSet};

use crate::assessment::complexity::ComplexityEstimator;
use crate::assessment::config::{SelectorConfig, TrapConfig};
use crate::assessment::mastery::weak_domains;
use crate::assessment::shuffle::{shuffled, Shuffler};
use crate::assessment::types::SessionPools;
use crate::store::operations::domain_mastery::DomainTally;
use crate::store::operations::items::Item;

/// Number of mastered items allowed into an unfiltered session of `target`.
pub fn mastered_allowance(ratio_cap: f64, target: usize) -> usize {
    // Epsilon keeps 0.3 * 10 from rounding up to 4.
    ((ratio_cap * target as f64) - 1e-9).ceil().max(0.0) as usize
}

/// Pushes candidates in order until `selected` holds `limit` items, skipping
/// ids already taken and ids in `exclude`.
fn fill(
    selected: &mut Vec<Item>,
    seen: &mut HashSet<String>,
    candidates: Vec<Item>,
    limit: usize,
    exclude: Option<&HashSet<String>>,
) {
    for item in candidates {
        if selected.len() >= limit {
            break;
        }
        if exclude.is_some_and(|ex| ex.contains(&item.id)) {
            continue;
        }
        if seen.insert(item.id.clone()) {
            selected.push(item);
        }
    }
}

pub struct SessionSelector<'a> {
    config: &'a SelectorConfig,
    trap: &'a TrapConfig,
    shuffler: &'a dyn Shuffler,
}

impl<'a> SessionSelector<'a> {
    pub fn new(config: &'a SelectorConfig, trap: &'a TrapConfig, shuffler: &'a dyn Shuffler) -> Self {
        Self {
            config,
            trap,
            shuffler,
        }
    }

    /// Learning first, then new, then a capped share of mastered items. The
    /// cap is lifted when the session is narrowed to one domain.
    pub fn select_session(
        &self,
        pools: SessionPools,
        target: usize,
        domain_filter: Option<&str>,
    ) -> Vec<Item> {
        let SessionPools {
            new,
            learning,
            mastered,
        } = pools;
        let mut selected = Vec::with_capacity(target.min(new.len() + learning.len() + mastered.len()));
        let mut seen = HashSet::new();

        fill(
            &mut selected,
            &mut seen,
            shuffled(self.shuffler, learning),
            target,
            None,
        );
        fill(&mut selected, &mut seen, shuffled(self.shuffler, new), target, None);

        if selected.len() < target && !mastered.is_empty() {
            let remaining = target - selected.len();
            let allowance = if domain_filter.is_some() {
                remaining
            } else {
                remaining.min(mastered_allowance(self.config.mastered_ratio_cap, target))
            };
            let limit = selected.len() + allowance;
            fill(
                &mut selected,
                &mut seen,
                shuffled(self.shuffler, mastered),
                limit,
                None,
            );
        }

        shuffled(self.shuffler, selected)
    }

    /// Progress-blind random draw, as in a real exam.
    pub fn simulation_set(&self, pool: Vec<Item>, size: usize) -> Vec<Item> {
        let mut selected = Vec::with_capacity(size.min(pool.len()));
        let mut seen = HashSet::new();
        fill(&mut selected, &mut seen, shuffled(self.shuffler, pool), size, None);
        selected
    }

    /// Narrows a trap pool to hard items once the user is stable on it, but
    /// only when enough hard items exist to run a session.
    pub fn trap_candidates(
        &self,
        pool: Vec<Item>,
        mastery_score: f64,
        estimator: &dyn ComplexityEstimator,
    ) -> Vec<Item> {
        if mastery_score <= self.trap.stable_threshold {
            return pool;
        }
        let hard: Vec<Item> = pool
            .iter()
            .filter(|item| estimator.is_complex(item).unwrap_or(false))
            .cloned()
            .collect();
        if hard.len() >= self.trap.min_hard_candidates {
            hard
        } else {
            tracing::debug!(
                hard = hard.len(),
                pool = pool.len(),
                "Not enough hard trap items, keeping full pool"
            );
            pool
        }
    }

    pub fn trap_session(&self, candidates: Vec<Item>, target: usize) -> Vec<Item> {
        self.simulation_set(candidates, target)
    }

    /// Tops `selected` up from `backfill` without duplicates. Never fails on a
    /// short backfill; whatever fits is kept.
    pub fn backfill(&self, mut selected: Vec<Item>, backfill: Vec<Item>, target: usize) -> Vec<Item> {
        let mut seen: HashSet<String> = selected.iter().map(|i| i.id.clone()).collect();
        fill(&mut selected, &mut seen, backfill, target, None);
        selected
    }

    /// How many backfill candidates to request for a shortfall.
    pub fn backfill_request(&self, shortfall: usize) -> usize {
        shortfall * self.config.backfill_factor
    }

    /// Weak domains when there are any, otherwise a random pick of known
    /// domains (the aggregate's, or the exam's when the aggregate is empty).
    pub fn target_domains(
        &self,
        tallies: Option<&BTreeMap<String, DomainTally>>,
        exam_domains: &[String],
    ) -> Vec<String> {
        let tallies = tallies.filter(|t| !t.is_empty());
        if let Some(tallies) = tallies {
            let weak = weak_domains(tallies, self.config.weak_domain_accuracy);
            if !weak.is_empty() {
                return weak;
            }
            let known: Vec<String> = tallies.keys().cloned().collect();
            return self.random_domains(known);
        }
        self.random_domains(exam_domains.to_vec())
    }

    fn random_domains(&self, known: Vec<String>) -> Vec<String> {
        let mut picked = shuffled(self.shuffler, known);
        picked.truncate(self.config.random_domain_count);
        picked
    }

    pub fn per_domain_fetch(&self, size: usize, domain_count: usize) -> usize {
        if domain_count == 0 {
            return 0;
        }
        size.div_ceil(domain_count) * self.config.weak_domain_fetch_factor
    }

    /// Walks the per-domain batches in order, filling up to `size` while
    /// honouring the exclusion list.
    pub fn weak_domain_quiz(
        &self,
        per_domain: Vec<Vec<Item>>,
        exclude: &HashSet<String>,
        size: usize,
    ) -> Vec<Item> {
        let mut selected = Vec::with_capacity(size);
        let mut seen = HashSet::new();
        for batch in per_domain {
            if selected.len() >= size {
                break;
            }
            fill(
                &mut selected,
                &mut seen,
                shuffled(self.shuffler, batch),
                size,
                Some(exclude),
            );
        }
        selected
    }

    /// Fixed count per domain, then mixed.
    pub fn diagnostic_set(&self, per_domain: Vec<Vec<Item>>) -> Vec<Item> {
        let mut selected = Vec::new();
        let mut seen = HashSet::new();
        for batch in per_domain {
            let limit = selected.len() + self.config.diagnostic_per_domain;
            fill(&mut selected, &mut seen, shuffled(self.shuffler, batch), limit, None);
        }
        shuffled(self.shuffler, selected)
    }

    pub fn finish(&self, selected: Vec<Item>) -> Vec<Item> {
        shuffled(self.shuffler, selected)
    }
}
