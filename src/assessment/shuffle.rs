use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Source of random permutations for session assembly.
///
/// Implementations permute an index slice in place; `shuffled` applies the
/// permutation to any vector so the trait stays object safe.
pub trait Shuffler: Send + Sync {
    fn shuffle_indices(&self, indices: &mut [usize]);
}

pub fn shuffled<T>(shuffler: &dyn Shuffler, items: Vec<T>) -> Vec<T> {
    if items.len() < 2 {
        return items;
    }
    let mut order: Vec<usize> = (0..items.len()).collect();
    shuffler.shuffle_indices(&mut order);

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

/// Fisher–Yates over the thread-local RNG. No ordering guarantee across calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngShuffler;

impl Shuffler for ThreadRngShuffler {
    fn shuffle_indices(&self, indices: &mut [usize]) {
        indices.shuffle(&mut rand::thread_rng());
    }
}

/// Reproducible sequence for tests and replays.
#[derive(Debug)]
pub struct SeededShuffler {
    rng: Mutex<StdRng>,
}

impl SeededShuffler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Shuffler for SeededShuffler {
    fn shuffle_indices(&self, indices: &mut [usize]) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        indices.shuffle(&mut *rng);
    }
}

/// Leaves order untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityShuffler;

impl Shuffler for IdentityShuffler {
    fn shuffle_indices(&self, _indices: &mut [usize]) {}
}
