//! crates/sa_pipeline/src/generate.rs
//! Synthetic vote tables: every cell's share of its district total is drawn
//! from a Beta distribution centred on the reference share.

use rand_chacha::ChaCha20Rng;
use rand_distr::{Beta, Distribution};

use sa_core::VoteMatrix;

use crate::PipelineError;

/// Beta perturbation around a reference table.
///
/// `stability` is the concentration `a + b`, plus one; higher values keep the
/// draws closer to the reference.
#[derive(Debug, Clone)]
pub struct BetaGenerator {
    reference: VoteMatrix,
    concentration: f64,
}

impl BetaGenerator {
    pub fn new(reference: VoteMatrix, stability: f64) -> Result<Self, PipelineError> {
        if !(stability.is_finite() && stability > 1.0) {
            return Err(PipelineError::Config(format!("stability must be > 1, got {stability}")));
        }
        Ok(Self { reference, concentration: stability - 1.0 })
    }

    pub fn reference(&self) -> &VoteMatrix {
        &self.reference
    }

    /// One table. A district without votes keeps its reference row.
    pub fn draw(&self, rng: &mut ChaCha20Rng) -> Result<VoteMatrix, PipelineError> {
        self.reference.iter().map(|row| self.draw_row(row, rng)).collect()
    }

    fn draw_row(&self, row: &[u64], rng: &mut ChaCha20Rng) -> Result<Vec<u64>, PipelineError> {
        let total: u64 = row.iter().sum();
        if total == 0 {
            return Ok(row.to_vec());
        }
        let total = total as f64;
        row.iter()
            .map(|&v| {
                let mean = v as f64 / total;
                let share = if mean <= 0.0 || mean >= 1.0 {
                    mean
                } else {
                    let beta = Beta::new(mean * self.concentration, (1.0 - mean) * self.concentration)
                        .map_err(|e| PipelineError::Generate(format!("beta({mean}): {e}")))?;
                    beta.sample(rng)
                };
                Ok((share * total).round() as u64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::rng::stream_rng;

    fn reference() -> VoteMatrix {
        vec![vec![600, 300, 100], vec![0, 0, 0], vec![0, 1000, 0]]
    }

    #[test]
    fn same_stream_same_table() {
        let g = BetaGenerator::new(reference(), 50.0).unwrap();
        let a = g.draw(&mut stream_rng(7, 3)).unwrap();
        let b = g.draw(&mut stream_rng(7, 3)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, g.draw(&mut stream_rng(7, 4)).unwrap());
    }

    #[test]
    fn degenerate_rows_are_copied() {
        let g = BetaGenerator::new(reference(), 2.0).unwrap();
        let t = g.draw(&mut stream_rng(1, 0)).unwrap();
        assert_eq!(t[1], vec![0, 0, 0]);
        assert_eq!(t[2], vec![0, 1000, 0]);
    }

    #[test]
    fn high_stability_stays_close() {
        let g = BetaGenerator::new(reference(), 1.0e7).unwrap();
        let t = g.draw(&mut stream_rng(9, 0)).unwrap();
        for (x, r) in t[0].iter().zip(&reference()[0]) {
            assert!((*x as f64 - *r as f64).abs() <= 5.0, "{x} vs {r}");
        }
    }

    #[test]
    fn stability_must_exceed_one() {
        assert!(BetaGenerator::new(reference(), 1.0).is_err());
        assert!(BetaGenerator::new(reference(), f64::NAN).is_err());
    }
}
