//! Monge-style selection.
//!
//! For each open cell `a = (d, p)` the score is the minimum, over every other
//! open cell `b = (d2, p2)` with `d2 ≠ d` and `p2 ≠ p`, of the cross ratio
//! `dv(d,p)·dv(d2,p2) / (dv(d,p2)·dv(d2,p))`. Pairs with a zero denominator
//! are ignored; a cell with no comparable pair scores +∞. The seat goes to the
//! largest `(score, dv)`; ties keep the first cell in row-major order.
//!
//! Cost is quadratic in open cells per seat, which is fine at election sizes.

use core::cmp::Ordering;

use super::{AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};

fn min_cross_ratio(board: &Board<'_>, open: &[(usize, usize)], d: usize, p: usize) -> f64 {
    let a = board.dv(d, p);
    let mut best = f64::INFINITY;
    for &(d2, p2) in open {
        if d2 == d || p2 == p {
            continue;
        }
        let denom = board.dv(d, p2) * board.dv(d2, p);
        if denom <= 0.0 {
            continue;
        }
        best = best.min(a * board.dv(d2, p2) / denom);
    }
    best
}

pub fn monge(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    Board::new(input).fill(|board| {
        let open: Vec<(usize, usize)> = board.open_cells().collect();
        let mut best: Option<((f64, f64), (usize, usize))> = None;
        for &(d, p) in &open {
            let key = (min_cross_ratio(board, &open, d, p), board.dv(d, p));
            let better = match best {
                None => true,
                Some((b, _)) => cmp_key(key, b) == Ordering::Greater,
            };
            if better {
                best = Some((key, (d, p)));
            }
        }
        let ((ratio, dv), (d, p)) = best?;
        let score = if ratio.is_finite() { ratio } else { dv };
        Some((d, p, AwardReason::CrossRatio, score))
    })
}

#[inline]
fn cmp_key(a: (f64, f64), b: (f64, f64)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn single_open_cell_wins_by_divided_vote() {
        let owned = concentrated([2, 2]);
        let out = monge(&owned.input()).unwrap();
        assert_eq!(out.allocation, vec![vec![2, 0], vec![0, 2]]);
        // no comparable pair, so scores are the divided votes: 20, 10, 10, 5
        assert_eq!(out.trail[0].score, 20.0);
    }

    #[test]
    fn concentrated_infeasible_targets_stop() {
        let owned = concentrated([1, 3]);
        assert!(matches!(monge(&owned.input()), Err(AdjustError::Infeasible { .. })));
    }

    #[test]
    fn conserves_on_full_table() {
        let owned = three_by_three();
        let out = monge(&owned.input()).unwrap();
        assert_conserves(&owned.input(), &out);
    }
}
