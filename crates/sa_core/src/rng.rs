// crates/sa_core/src/rng.rs
//
// Deterministic RNG utilities for tie-breaking and simulation streams.
// Focus: unbiased range generation, stable seeding, word-index crumbs.
//
// • `tie_seed` (Rules) is the only source of randomness for ties inside the
//   law-derived adjustment methods. Every pick is logged as a `TieCrumb`.
// • Simulation iterations draw from independent ChaCha20 streams selected by
//   iteration index, so iteration `i` is reproducible on its own.
// • Cross-platform determinism: explicit seeding and word-index accounting.

use smol_str::SmolStr;

use serde::{Deserialize, Serialize};

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// A single logged decision for a tie, including context and the RNG word index.
///
/// `word_index` is **1-based**: the first 64-bit RNG word consumed by this
/// `TieRng` has index 1; the second has index 2; etc. For range generation
/// using rejection sampling, `word_index` refers to the **accepted** RNG word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieCrumb {
    /// Stable, human-readable context (e.g., "seat:12/party").
    pub ctx: SmolStr,
    /// Chosen index in the contender set (0-based).
    pub pick: usize,
    /// Number of tied contenders.
    pub of: usize,
    /// 1-based index of the deciding RNG 64-bit word.
    pub word_index: u128,
}

/// Explicit mapping from a `u64` seed to the 32-byte ChaCha20 seed:
/// `seed.to_le_bytes()` into the first 8 bytes; the remaining 24 bytes are zero.
#[inline]
fn seed32(seed: u64) -> [u8; 32] {
    let mut s = [0u8; 32];
    s[..8].copy_from_slice(&seed.to_le_bytes());
    s
}

/// ChaCha20 generator for simulation iteration `stream` under `seed`.
///
/// Streams are independent; iteration order and thread placement do not
/// change what a given iteration draws.
pub fn stream_rng(seed: u64, stream: u64) -> ChaCha20Rng {
    let mut rng = ChaCha20Rng::from_seed(seed32(seed));
    rng.set_stream(stream);
    rng
}

/// Deterministic RNG for ties.
#[derive(Debug, Clone)]
pub struct TieRng {
    rng: ChaCha20Rng,
    words_consumed: u128,
    crumbs: Vec<TieCrumb>,
}

impl TieRng {
    /// Construct from a 64-bit tie seed (stream 0).
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        Self::from_seed_and_stream(seed, 0)
    }

    /// Construct from a tie seed and a stream selector (simulation iteration).
    #[inline]
    pub fn from_seed_and_stream(seed: u64, stream: u64) -> Self {
        Self {
            rng: stream_rng(seed, stream),
            words_consumed: 0,
            crumbs: Vec::new(),
        }
    }

    /// Total number of 64-bit words consumed so far.
    #[inline]
    pub fn words_consumed(&self) -> u128 {
        self.words_consumed
    }

    /// Tie decisions taken so far, in order.
    #[inline]
    pub fn crumbs(&self) -> &[TieCrumb] {
        &self.crumbs
    }

    /// Draw the next u64 from the stream and increment the word counter.
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.words_consumed = self.words_consumed.saturating_add(1);
        self.rng.next_u64()
    }

    /// Unbiased integer in [0, n) using rejection sampling. Returns `None` if `n == 0`.
    ///
    /// Let `threshold = 2^64 mod n` (computed via `wrapping_neg() % n`).
    /// Accept `x` if `x >= threshold`; then `x % n` is uniformly distributed.
    #[inline]
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        self.gen_range_with_index(n).map(|(v, _idx)| v)
    }

    /// Same as `gen_range`, but also returns the **1-based** index of the deciding word.
    #[inline]
    pub fn gen_range_with_index(&mut self, n: u64) -> Option<(u64, u128)> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some((x % n, self.words_consumed));
            }
        }
    }

    /// Pick one of `n` tied contenders uniformly and record a crumb.
    ///
    /// A single contender is returned without consuming any RNG word, so runs
    /// without ties never touch the stream.
    pub fn pick_tied(&mut self, ctx: &str, n: usize) -> Option<usize> {
        match n {
            0 => None,
            1 => Some(0),
            _ => {
                let (v, word_index) = self.gen_range_with_index(n as u64)?;
                let pick = v as usize;
                self.crumbs.push(TieCrumb { ctx: SmolStr::new(ctx), pick, of: n, word_index });
                Some(pick)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_range_zero_none() {
        let mut rng = TieRng::from_seed_u64(0xDEADBEEFCAFEBABE);
        assert_eq!(rng.gen_range(0), None);
        assert_eq!(rng.words_consumed(), 0);
    }

    #[test]
    fn same_seed_same_picks() {
        let mut a = TieRng::from_seed_u64(123456789);
        let mut b = TieRng::from_seed_u64(123456789);
        let seq_a: Vec<_> = (0..16).map(|_| a.pick_tied("t", 5)).collect();
        let seq_b: Vec<_> = (0..16).map(|_| b.pick_tied("t", 5)).collect();
        assert_eq!(seq_a, seq_b);
        assert_eq!(a.crumbs(), b.crumbs());
        assert_eq!(a.crumbs().len(), 16);
    }

    #[test]
    fn single_contender_consumes_nothing() {
        let mut rng = TieRng::from_seed_u64(7);
        assert_eq!(rng.pick_tied("solo", 1), Some(0));
        assert_eq!(rng.pick_tied("none", 0), None);
        assert_eq!(rng.words_consumed(), 0);
        assert!(rng.crumbs().is_empty());
    }

    #[test]
    fn streams_are_independent_but_reproducible() {
        let mut s1 = stream_rng(42, 1);
        let mut s1b = stream_rng(42, 1);
        let mut s2 = stream_rng(42, 2);
        let a = s1.next_u64();
        assert_eq!(a, s1b.next_u64());
        assert_ne!(a, s2.next_u64());
    }
}
