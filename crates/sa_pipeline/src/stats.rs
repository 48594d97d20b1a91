//! crates/sa_pipeline/src/stats.rs
//! One-pass statistics: count, Σx, Σx², min, max. Accumulators merge
//! associatively so parallel partial results can be folded in any grouping.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureAccumulator {
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for MeasureAccumulator {
    fn default() -> Self {
        Self { count: 0, sum: 0.0, sum_sq: 0.0, min: f64::INFINITY, max: f64::NEG_INFINITY }
    }
}

impl MeasureAccumulator {
    pub fn observe(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sample variance; 0 for fewer than two observations. Clamped at 0
    /// against cancellation.
    pub fn summary(&self) -> Summary {
        if self.count == 0 {
            return Summary::default();
        }
        let n = self.count as f64;
        let avg = self.sum / n;
        let var = if self.count > 1 {
            ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0)
        } else {
            0.0
        };
        Summary { count: self.count, avg, var, std: var.sqrt(), min: self.min, max: self.max }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub count: u64,
    pub avg: f64,
    pub var: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn two_pass(xs: &[f64]) -> (f64, f64) {
        let n = xs.len() as f64;
        let avg = xs.iter().sum::<f64>() / n;
        let var = if xs.len() > 1 {
            xs.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        (avg, var)
    }

    #[test]
    fn single_observation_has_zero_variance() {
        let mut acc = MeasureAccumulator::default();
        acc.observe(3.25);
        let s = acc.summary();
        assert_eq!((s.count, s.avg, s.var, s.std, s.min, s.max), (1, 3.25, 0.0, 0.0, 3.25, 3.25));
    }

    #[test]
    fn empty_summary_is_zeroed() {
        assert_eq!(MeasureAccumulator::default().summary(), Summary::default());
    }

    proptest! {
        #[test]
        fn one_pass_matches_two_pass(xs in prop::collection::vec(-10.0f64..10.0, 1..200)) {
            let mut acc = MeasureAccumulator::default();
            xs.iter().for_each(|&x| acc.observe(x));
            let s = acc.summary();
            let (avg, var) = two_pass(&xs);
            prop_assert!((s.avg - avg).abs() < 1e-9);
            prop_assert!((s.var - var).abs() < 1e-9);
            prop_assert!((s.std - var.sqrt()).abs() < 1e-5);
        }

        #[test]
        fn merge_equals_sequential(xs in prop::collection::vec(-50.0f64..50.0, 0..60), cut in 0usize..60) {
            let cut = cut.min(xs.len());
            let mut whole = MeasureAccumulator::default();
            xs.iter().for_each(|&x| whole.observe(x));
            let (mut left, mut right) = (MeasureAccumulator::default(), MeasureAccumulator::default());
            xs[..cut].iter().for_each(|&x| left.observe(x));
            xs[cut..].iter().for_each(|&x| right.observe(x));
            left.merge(&right);
            prop_assert_eq!(left.count(), whole.count());
            prop_assert_eq!(left.summary().min, whole.summary().min);
            prop_assert_eq!(left.summary().max, whole.summary().max);
            prop_assert!((left.summary().avg - whole.summary().avg).abs() < 1e-9);
        }
    }
}
