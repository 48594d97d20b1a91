//! Alternating scaling (biproportional fixed point) and its variable-step variant.
//!
//! Each round:
//! 1. every open district apportions its row target over its (scaled) votes,
//!    keeping the constituency seats as priors, and divides its row by the
//!    multiplier that separates used from unused divided values;
//! 2. every open party does the same down its column.
//!
//! The multiplier is 1.0 when the current scale already separates
//! (`max_unused ≤ 1 ≤ min_used`), else the midpoint of the two. The run is
//! settled as soon as the row step's allocation also meets the column
//! targets. A round whose multipliers are all within `TOLERANCE` of 1.0
//! without meeting them has stalled; so has a run that reaches `MAX_ROUNDS`.
//!
//! Districts and parties already filled by their priors are zeroed up front, and a max-flow check
//! rejects targets that no allocation could meet.

use tracing::debug;

use sa_core::matrix;

use super::{trail_from_allocation, AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};
use crate::apportion::apportion1d;
use crate::feasibility::transport_feasible;
use crate::threshold::eliminate_satisfied;

pub const MAX_ROUNDS: u32 = 100;
pub const TOLERANCE: f64 = 1e-5;
/// Smallest exponent the variable-step variant will shrink to.
pub const MIN_ALPHA: f64 = 1.0 / 64.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Fixed,
    Variable,
}

pub fn alternating_scaling(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    scale(input, Step::Fixed)
}

pub fn var_alt_scal(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    scale(input, Step::Variable)
}

#[inline]
fn multiplier(min_used: Option<f64>, max_unused: f64) -> f64 {
    match min_used {
        None => 1.0,
        Some(lo) if max_unused <= 1.0 && 1.0 <= lo => 1.0,
        Some(lo) => (lo + max_unused) / 2.0,
    }
}

fn scale(input: &AdjustmentInput<'_>, step: Step) -> Result<AdjustmentOutcome, AdjustError> {
    let board = Board::new(input);
    let (rows, cols) = (input.districts(), input.parties());

    let open: Vec<Vec<bool>> = (0..rows)
        .map(|d| (0..cols).map(|p| board.is_open(d, p)).collect())
        .collect();
    if !transport_feasible(&open, &board.free_row, &board.free_col) {
        let district = board
            .stuck_district()
            .or_else(|| board.free_row.iter().position(|&f| f > 0))
            .unwrap_or(0);
        return Err(AdjustError::Infeasible { seat: 0, district });
    }
    if board.done() {
        return Ok(board.finish());
    }

    let active_rows: Vec<usize> = (0..rows).filter(|&d| board.free_row[d] > 0).collect();
    let active_cols: Vec<usize> = (0..cols).filter(|&p| board.free_col[p] > 0).collect();
    let prior_cols = matrix::transpose(input.prior, cols);

    let full_rows: Vec<bool> = board.free_row.iter().map(|&f| f == 0).collect();
    let full_cols: Vec<bool> = board.free_col.iter().map(|&f| f == 0).collect();
    let mut w = eliminate_satisfied(input.votes, Some(&full_rows), Some(&full_cols));

    let mut alpha = 1.0_f64;
    let mut last_worst = f64::INFINITY;

    for round in 0..MAX_ROUNDS {
        let mut worst = 0.0_f64;
        let apply = |m: f64, worst: &mut f64| -> f64 {
            *worst = worst.max(m.ln().abs());
            if step == Step::Variable { m.powf(alpha) } else { m }
        };

        // Row half-step.
        let mut alloc = input.prior.to_vec();
        for &d in &active_rows {
            let a = apportion1d(&w[d], input.row_targets[d], &input.prior[d], input.rule, None, None)
                .map_err(|_| AdjustError::Infeasible { seat: 0, district: d })?;
            let m = apply(multiplier(a.min_used, a.max_unused(&w[d])), &mut worst);
            if m != 1.0 {
                w[d].iter_mut().for_each(|x| *x /= m);
            }
            alloc[d] = a.seats;
        }

        if matrix::col_sums(&alloc, cols) == input.col_targets {
            debug!(round, "scaling settled");
            let trail = trail_from_allocation(input, &alloc, AwardReason::ScaledVotes, |d, p, k| {
                w[d][p] / input.rule.divisor_at(k)
            });
            return Ok(AdjustmentOutcome { allocation: alloc, trail, violating: false });
        }

        // Column half-step.
        for &p in &active_cols {
            let column: Vec<f64> = w.iter().map(|r| r[p]).collect();
            let a = apportion1d(&column, input.col_targets[p], &prior_cols[p], input.rule, None, None)
                .map_err(|_| AdjustError::Infeasible {
                    seat: 0,
                    district: active_rows.first().copied().unwrap_or(0),
                })?;
            let m = apply(multiplier(a.min_used, a.max_unused(&column)), &mut worst);
            if m != 1.0 {
                w.iter_mut().for_each(|r| r[p] /= m);
            }
        }

        debug!(round, worst, alpha, "scaling round");
        if worst <= TOLERANCE {
            return Err(AdjustError::NonConvergence { rounds: round + 1 });
        }
        if step == Step::Variable && worst >= last_worst {
            alpha = (alpha / 2.0).max(MIN_ALPHA);
        }
        last_worst = worst;
    }

    Err(AdjustError::NonConvergence { rounds: MAX_ROUNDS })
}
