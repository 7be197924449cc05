use burn::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Deterministic seeding context for one training run.
///
/// Created once at run start; every stochastic collaborator receives its
/// own derived rng stream, so no process-wide seed state exists.
#[derive(Debug)]
pub struct RunContext {
    seed: u64,
    streams: u64,
}

impl RunContext {
    pub fn new(seed: u64) -> Self {
        Self { seed, streams: 0 }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seeds the backend generator used for parameter initialization.
    pub fn seed_backend<B: Backend>(&self, device: &B::Device) {
        B::seed(self.seed);
    }

    /// Returns a fresh rng stream; successive calls never overlap.
    pub fn rng(&mut self) -> StdRng {
        let stream = self.streams;
        self.streams += 1;
        StdRng::seed_from_u64(self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}
