//! Deterministic room RNG
//!
//! Every room owns exactly one `GameRng` seeded at creation. All simulation
//! draws (spawns, swaps, loot) go through this handle in a fixed per-tick
//! order, so a room replayed from the same seed reproduces bit-identical
//! results. Loot rolls construct their own short-lived streams from a caller
//! seed and never touch the room stream.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded pseudo-random stream with game-flavored draw helpers.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform f32 in [0, 1).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Uniform f32 in [min, max). Returns `min` when the range is empty.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..max)
    }

    /// Uniform f64 in [min, max). Returns `min` when the range is empty.
    pub fn range_f64(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..max)
    }

    /// Uniform u32 in [min, max] inclusive.
    pub fn range_u32(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..=max)
    }

    /// Bernoulli draw.
    pub fn chance(&mut self, probability: f32) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.next_f32() < probability
    }

    /// Uniform index into a slice of the given length. Returns 0 for empty
    /// or single-element slices.
    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.inner.gen_range(0..len)
    }

    /// Weighted index draw. Falls back to a uniform pick when the total
    /// weight is non-positive, so a draw always yields a valid index for a
    /// non-empty slice.
    pub fn weighted_index(&mut self, weights: &[f32]) -> usize {
        if weights.is_empty() {
            return 0;
        }
        let total: f32 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
        if total <= 0.0 {
            return self.pick_index(weights.len());
        }
        let mut roll = self.range_f32(0.0, total);
        for (i, &w) in weights.iter().enumerate() {
            if !(w.is_finite() && w > 0.0) {
                continue;
            }
            if roll < w {
                return i;
            }
            roll -= w;
        }
        weights.len() - 1
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        if slice.len() < 2 {
            return;
        }
        for i in (1..slice.len()).rev() {
            let j = self.inner.gen_range(0..=i);
            slice.swap(i, j);
        }
    }

    /// Raw 64-bit draw, used to derive sub-seeds for loot streams.
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = GameRng::new(1);
        let mut b = GameRng::new(2);
        let same = (0..16).filter(|_| a.next_u64() == b.next_u64()).count();
        assert!(same < 16);
    }

    #[test]
    fn test_range_f32_bounds() {
        let mut rng = GameRng::new(7);
        for _ in 0..1000 {
            let v = rng.range_f32(45.0, 90.0);
            assert!((45.0..90.0).contains(&v));
        }
        assert_eq!(rng.range_f32(5.0, 5.0), 5.0);
    }

    #[test]
    fn test_weighted_index_respects_zero_weights() {
        let mut rng = GameRng::new(9);
        for _ in 0..500 {
            let i = rng.weighted_index(&[0.0, 1.0, 0.0]);
            assert_eq!(i, 1);
        }
    }

    #[test]
    fn test_weighted_index_uniform_fallback() {
        // Non-positive total weight falls back to a uniform pick
        let mut rng = GameRng::new(11);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[rng.weighted_index(&[0.0, 0.0, 0.0])] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_pick_index_in_bounds() {
        let mut rng = GameRng::new(13);
        for _ in 0..200 {
            assert!(rng.pick_index(5) < 5);
        }
        assert_eq!(rng.pick_index(0), 0);
        assert_eq!(rng.pick_index(1), 0);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = GameRng::new(17);
        let mut v: Vec<u32> = (0..10).collect();
        rng.shuffle(&mut v);
        let mut sorted = v.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = GameRng::new(19);
        assert!(!rng.chance(0.0));
        assert!(rng.chance(1.0));
    }
}
