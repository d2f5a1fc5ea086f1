//! Deterministic simulation RNG wrapper.
//!
//! # Determinism strategy
//!
//! One `SimRng` is seeded from the run's configured seed and threaded
//! explicitly through every component that needs randomness (delay models,
//! geocast receiver shuffling).  Because the kernel is single-threaded and
//! events dispatch in a total order, the sequence of draws, and with it the
//! whole trace, is reproducible for a given seed and configuration.
//!
//! Components that should not perturb each other's streams take a
//! [`child`](SimRng::child) RNG at construction time.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// The run's random source.
///
/// Implements [`RngCore`], so delay models take it through a plain
/// `R: rand::Rng` bound and `rand` adapters such as `gen_range` work on it.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Split off an independent stream. Draws one value from `self`, so the
    /// parent's sequence moves on as well.
    pub fn child(&mut self, salt: u64) -> SimRng {
        let seed = self.0.next_u64() ^ salt.wrapping_mul(MIXING_CONSTANT);
        SimRng::new(seed)
    }

    /// Uniform `f64` in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Random permutation of `items`, used to pick geocast unicast targets.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.0);
    }
}

impl RngCore for SimRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}
