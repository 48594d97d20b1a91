//! Nearest-neighbour rounding toward an ideal fractional allocation.
//!
//! `ideal[d][p] = sqrt(r · c)` with `r = row_target[d] · votes[d][p] / Σ_p votes[d]`
//! and `c = col_target[p] · votes[d][p] / Σ_d votes[·][p]` (eliminated votes).
//! Each seat goes to the open cell with the largest `ideal − current`;
//! ties prefer the larger `dv`, then the first cell.

use core::cmp::Ordering;

use sa_core::matrix;

use super::{AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};

pub(crate) fn ideal(input: &AdjustmentInput<'_>) -> Vec<Vec<f64>> {
    let row_tot = matrix::vote_row_totals(input.votes);
    let col_tot = matrix::vote_col_totals(input.votes, input.parties());
    input
        .votes
        .iter()
        .enumerate()
        .map(|(d, row)| {
            row.iter()
                .enumerate()
                .map(|(p, &v)| {
                    if v <= 0.0 || row_tot[d] <= 0.0 || col_tot[p] <= 0.0 {
                        return 0.0;
                    }
                    let r = f64::from(input.row_targets[d]) * v / row_tot[d];
                    let c = f64::from(input.col_targets[p]) * v / col_tot[p];
                    (r * c).sqrt()
                })
                .collect()
        })
        .collect()
}

pub fn nearest_neighbor(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    let ideal = ideal(input);
    Board::new(input).fill(|board| {
        let mut best: Option<(f64, f64, usize, usize)> = None;
        for (d, p) in board.open_cells() {
            let gap = ideal[d][p] - f64::from(board.current[d][p]);
            let dv = board.dv(d, p);
            let better = best.map_or(true, |(g, v, _, _)| {
                gap.total_cmp(&g).then(dv.total_cmp(&v)) == Ordering::Greater
            });
            if better {
                best = Some((gap, dv, d, p));
            }
        }
        best.map(|(gap, _, d, p)| (d, p, AwardReason::NearestIdeal, gap))
    })
}
