//! Entropy-optimal allocation through an external optimizer.
//!
//! The engine does not solve the integer program itself. It hands an
//! `EntropyProblem` to whatever `EntropyOptimizer` the caller injected and
//! checks the answer: shape, row sums, column sums and the constituency
//! seats as lower bounds.

use sa_core::{matrix, AllocationMatrix, DivisorRule};

use super::{trail_from_allocation, AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason};

/// Maximise Σ ln(votes / divisor_at(k)) over awarded seats, subject to
/// exact row and column sums and `allocation ≥ prior`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyProblem {
    pub votes: Vec<Vec<f64>>,
    pub row_targets: Vec<u32>,
    pub col_targets: Vec<u32>,
    pub prior: AllocationMatrix,
    pub rule: DivisorRule,
}

impl EntropyProblem {
    pub fn from_input(input: &AdjustmentInput<'_>) -> Self {
        Self {
            votes: input.votes.to_vec(),
            row_targets: input.row_targets.to_vec(),
            col_targets: input.col_targets.to_vec(),
            prior: input.prior.to_vec(),
            rule: input.rule,
        }
    }
}

/// Constrained optimizer seam.
pub trait EntropyOptimizer: Send + Sync {
    fn solve(&self, problem: &EntropyProblem) -> Result<AllocationMatrix, String>;
}

fn check_solution(problem: &EntropyProblem, a: &[Vec<u32>]) -> Result<(), String> {
    let cols = problem.col_targets.len();
    if a.len() != problem.row_targets.len() || matrix::check_shape(a, cols).is_err() {
        return Err("allocation has the wrong shape".into());
    }
    if matrix::row_sums(a) != problem.row_targets {
        return Err("row sums differ from district targets".into());
    }
    if matrix::col_sums(a, cols) != problem.col_targets {
        return Err("column sums differ from party targets".into());
    }
    let below_prior = a
        .iter()
        .zip(&problem.prior)
        .any(|(r, pr)| r.iter().zip(pr).any(|(x, y)| x < y));
    if below_prior {
        return Err("allocation removes constituency seats".into());
    }
    Ok(())
}

pub fn opt_entropy(
    input: &AdjustmentInput<'_>,
    optimizer: Option<&dyn EntropyOptimizer>,
) -> Result<AdjustmentOutcome, AdjustError> {
    let optimizer = optimizer.ok_or(AdjustError::OptimizerUnavailable)?;
    let problem = EntropyProblem::from_input(input);
    let allocation = optimizer.solve(&problem).map_err(AdjustError::Optimizer)?;
    check_solution(&problem, &allocation).map_err(AdjustError::Optimizer)?;
    let trail = trail_from_allocation(input, &allocation, AwardReason::Optimizer, |d, p, k| {
        input.votes[d][p] / input.rule.divisor_at(k)
    });
    Ok(AdjustmentOutcome { allocation, trail, violating: false })
}
