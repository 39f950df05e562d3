//! Seeded random generator handed to the generative model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random state for one generation call.
///
/// A fresh generator is created from the run's seed for every frame, so
/// each frame's noise is reproducible and independent of the frames before
/// it.
#[derive(Debug, Clone)]
pub struct SeedGenerator {
    seed: u64,
    rng: StdRng,
}

impl SeedGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed this generator was created from. Backends that keep their
    /// own random state are re-seeded with it.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn next_byte(&mut self) -> u8 {
        self.rng.random()
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.random()
    }
}
