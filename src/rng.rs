//! Randomness for connection IDs, tokens and packet numbers left unset.

use rand::{RngCore, SeedableRng};

/// Source of random bytes.
pub trait Rng {
    /// Fill `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

/// Operating-system seeded CSPRNG, the default for real packets.
pub struct SystemRng(rand::rngs::ThreadRng);

impl SystemRng {
    pub fn new() -> Self {
        Self(rand::rng())
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng for SystemRng {
    fn fill(&mut self, buf: &mut [u8]) {
        self.0.fill_bytes(buf);
    }
}

/// Deterministic generator for reproducible fixtures.
pub struct SeededRng(rand::rngs::StdRng);

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl Rng for SeededRng {
    fn fill(&mut self, buf: &mut [u8]) {
        self.0.fill_bytes(buf);
    }
}
