//! Simple random number generator for model initialization.
//!
//! This module provides a lightweight xorshift-based PRNG. The server seeds it
//! from the clock once per process; tests seed it explicitly.

use std::time::{SystemTime, UNIX_EPOCH};

const FALLBACK_SEED: u64 = 0x9e3779b97f4a7c15;

/// Xorshift generator. Not cryptographic.
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { FALLBACK_SEED } else { seed };
        Self { state }
    }

    /// Create an RNG seeded from the current time.
    pub fn from_time() -> Self {
        let mut rng = Self::new(FALLBACK_SEED);
        rng.reseed_from_time();
        rng
    }

    /// Reseed based on the current time.
    pub fn reseed_from_time(&mut self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        self.state = if nanos == 0 { FALLBACK_SEED } else { nanos };
    }

    /// Basic xorshift to generate u32.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform sample in [0, 1).
    ///
    /// Only the top 24 bits are used so the result is exactly representable
    /// and can never round up to 1.0.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}
