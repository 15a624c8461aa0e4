//! # Deterministic RNG
//!
//! The seeded, hierarchical PRNG every stochastic choice in a run draws
//! from. The generator and its derivation scheme are a permanent part of
//! the determinism contract:
//!
//! - Generator: PCG32 (XSH-RR output, 64-bit LCG state, odd increment
//!   derived from the seed, one warm-up draw)
//! - Floats: built from the top 24 bits of a 32-bit draw to avoid bias
//! - Ranged draws: rejection sampling, no modulo bias
//! - Derivation: child seed = xxh64 (keyed by the parent's construction
//!   seed) over the little-endian buffer `(parent_seed, tick)` followed by
//!   the agent-id bytes (empty when absent)
//!
//! ## Rules
//! - Derivation takes `&self`: the parent's state never advances
//! - The derivation snapshot is the construction seed, not current state,
//!   so `derive` is a pure function of `(seed, tick, agent_id)`

use byteorder::{LittleEndian, WriteBytesExt};
use xxhash_rust::xxh64::Xxh64;

use af_types::{ForgeError, ForgeResult, Seed, Tick};

/// PCG32-based deterministic generator with hierarchical stream derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgeRng {
    seed: Seed,
    state: u64,
    increment: u64,
}

impl ForgeRng {
    /// PCG multiplier constant
    const MULTIPLIER: u64 = 6364136223846793005;

    /// Create a new generator from a seed.
    pub fn new(seed: Seed) -> Self {
        let mut rng = ForgeRng {
            seed,
            state: 0,
            increment: (seed.as_u64() << 1) | 1, // Must be odd
        };
        // Warm up the generator
        rng.state = rng.state.wrapping_add(seed.as_u64());
        let _ = rng.next_u32();
        rng
    }

    /// The seed this generator was constructed with (the derivation snapshot).
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Advance the internal state
    fn advance(&mut self) {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(self.increment);
    }

    /// Next 32-bit draw (XSH-RR output function).
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.advance();

        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Next 64-bit draw.
    pub fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    /// Float in `[0, 1)` from the top 24 bits of a 32-bit draw.
    pub fn next_float(&mut self) -> f64 {
        (self.next_u32() >> 8) as f64 / (1u32 << 24) as f64
    }

    /// Unbiased draw in `[0, bound)` via rejection sampling. `bound >= 1`.
    fn bounded(&mut self, bound: u64) -> u64 {
        if bound <= 1 {
            return 0;
        }
        let span = bound as u128;
        let limit = (1u128 << 64) - ((1u128 << 64) % span);
        loop {
            let v = self.next_u64() as u128;
            if v < limit {
                return (v % span) as u64;
            }
        }
    }

    /// Integer in `[min, max]` inclusive, rejection-sampled.
    pub fn int_in(&mut self, min: i64, max: i64) -> ForgeResult<i64> {
        if min > max {
            return Err(ForgeError::InvalidRange { min, max });
        }
        if min == i64::MIN && max == i64::MAX {
            return Ok(self.next_u64() as i64);
        }
        let span = ((max as i128) - (min as i128) + 1) as u64;
        let offset = self.bounded(span);
        Ok((min as i128 + offset as i128) as i64)
    }

    /// Pick one element from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> ForgeResult<&'a T> {
        if items.is_empty() {
            return Err(ForgeError::EmptySequence);
        }
        let idx = self.bounded(items.len() as u64) as usize;
        Ok(&items[idx])
    }

    /// Weighted pick. Non-positive weights contribute nothing; a
    /// non-positive total is an error.
    pub fn weighted_pick<'a, T>(&mut self, entries: &'a [(T, f64)]) -> ForgeResult<&'a T> {
        let total: f64 = entries.iter().map(|(_, w)| w.max(0.0)).sum();
        if !(total > 0.0) {
            return Err(ForgeError::ZeroWeight);
        }

        let target = self.next_float() * total;
        let mut acc = 0.0;
        let mut last_eligible = None;
        for (item, weight) in entries {
            let w = weight.max(0.0);
            if w <= 0.0 {
                continue;
            }
            acc += w;
            last_eligible = Some(item);
            if target < acc {
                return Ok(item);
            }
        }
        // Float accumulation can leave target == total; the last eligible
        // entry is the correct bucket.
        last_eligible.ok_or(ForgeError::ZeroWeight)
    }

    /// In-place Fisher–Yates shuffle of a caller-owned slice.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.bounded(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Bernoulli draw with clamped probability: `p <= 0` is always false,
    /// `p >= 1` is always true.
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            return false;
        }
        if p >= 1.0 {
            return true;
        }
        self.next_float() < p
    }

    /// 50/50 boolean.
    pub fn coin(&mut self) -> bool {
        self.next_u32() & 1 == 1
    }

    /// Derive an independent child stream for `(tick, agent_id)`.
    ///
    /// Pure in the parent: distinct `(tick, agent_id)` pairs yield
    /// statistically independent streams and the parent state is untouched.
    pub fn derive(&self, tick: Tick, agent_id: Option<&str>) -> ForgeRng {
        let mut buf = Vec::with_capacity(16);
        buf.write_u64::<LittleEndian>(self.seed.as_u64()).unwrap();
        buf.write_u64::<LittleEndian>(tick.as_u64()).unwrap();

        let mut hasher = Xxh64::new(self.seed.as_u64());
        hasher.update(&buf);
        hasher.update(agent_id.unwrap_or("").as_bytes());

        ForgeRng::new(Seed::new(hasher.digest()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_sequence() {
        let mut a = ForgeRng::new(Seed::new(42));
        let mut b = ForgeRng::new(Seed::new(42));

        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_different_sequences() {
        let mut a = ForgeRng::new(Seed::new(42));
        let mut b = ForgeRng::new(Seed::new(43));

        let seq_a: Vec<u32> = (0..10).map(|_| a.next_u32()).collect();
        let seq_b: Vec<u32> = (0..10).map(|_| b.next_u32()).collect();

        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn float_is_in_unit_interval() {
        let mut rng = ForgeRng::new(Seed::new(7));
        for _ in 0..1000 {
            let f = rng.next_float();
            assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn int_in_respects_bounds() {
        let mut rng = ForgeRng::new(Seed::new(12345));
        for _ in 0..1000 {
            let v = rng.int_in(-10, 10).unwrap();
            assert!((-10..=10).contains(&v));
        }
    }

    #[test]
    fn int_in_rejects_inverted_range() {
        let mut rng = ForgeRng::new(Seed::new(1));
        assert_eq!(
            rng.int_in(5, 2),
            Err(ForgeError::InvalidRange { min: 5, max: 2 })
        );
    }

    #[test]
    fn int_in_degenerate_range() {
        let mut rng = ForgeRng::new(Seed::new(1));
        assert_eq!(rng.int_in(3, 3).unwrap(), 3);
    }

    #[test]
    fn pick_rejects_empty() {
        let mut rng = ForgeRng::new(Seed::new(1));
        let empty: [u8; 0] = [];
        assert_eq!(rng.pick(&empty), Err(ForgeError::EmptySequence));
    }

    #[test]
    fn weighted_pick_rejects_zero_total() {
        let mut rng = ForgeRng::new(Seed::new(1));
        let entries = [("a", 0.0), ("b", 0.0)];
        assert!(matches!(
            rng.weighted_pick(&entries),
            Err(ForgeError::ZeroWeight)
        ));
    }

    #[test]
    fn weighted_pick_skips_non_positive_weights() {
        let mut rng = ForgeRng::new(Seed::new(9));
        let entries = [("never", 0.0), ("always", 1.0), ("negative", -3.0)];
        for _ in 0..100 {
            assert_eq!(*rng.weighted_pick(&entries).unwrap(), "always");
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = ForgeRng::new(Seed::new(77));
        let mut items: Vec<u32> = (0..20).collect();
        rng.shuffle(&mut items);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
    }

    #[test]
    fn shuffle_is_deterministic() {
        let mut a = ForgeRng::new(Seed::new(77));
        let mut b = ForgeRng::new(Seed::new(77));
        let mut items_a: Vec<u32> = (0..20).collect();
        let mut items_b: Vec<u32> = (0..20).collect();
        a.shuffle(&mut items_a);
        b.shuffle(&mut items_b);
        assert_eq!(items_a, items_b);
    }

    #[test]
    fn chance_clamps() {
        let mut rng = ForgeRng::new(Seed::new(5));
        assert!(!rng.chance(0.0));
        assert!(!rng.chance(-1.0));
        assert!(rng.chance(1.0));
        assert!(rng.chance(2.0));
    }

    #[test]
    fn derive_does_not_advance_parent() {
        let parent = ForgeRng::new(Seed::new(1000));
        let mut a = parent.clone();
        let _child = parent.derive(Tick(5), Some("agent-0"));
        let mut b = parent.clone();
        assert_eq!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn derive_is_pure() {
        let parent = ForgeRng::new(Seed::new(1000));
        let mut c1 = parent.derive(Tick(3), Some("trader-1"));
        let mut c2 = parent.derive(Tick(3), Some("trader-1"));
        for _ in 0..50 {
            assert_eq!(c1.next_u64(), c2.next_u64());
        }
    }

    #[test]
    fn distinct_pairs_yield_distinct_streams() {
        let parent = ForgeRng::new(Seed::new(1000));
        let mut by_tick = parent.derive(Tick(1), Some("trader-0"));
        let mut by_agent = parent.derive(Tick(1), Some("trader-1"));
        let mut by_none = parent.derive(Tick(1), None);

        let a = by_tick.next_u64();
        let b = by_agent.next_u64();
        let c = by_none.next_u64();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
