//! Icelandic election-law procedures.
//!
//! `icelandic_law`: seat by seat, the party with the best national number
//! `national_votes[p] / divisor_at(seats_so_far[p])` among parties that still
//! need seats and have an open cell; then, within that party, the open
//! district with the best list share
//! `votes[d][p] / Σ orig_votes[d] / divisor_at(current[d][p])`.
//!
//! `icelandic_share_law`: one global ranking of list shares over all open cells.
//!
//! Exact ties are settled by the seeded `TieRng`; every pick is recorded as a crumb.

use sa_core::{matrix, TieRng};

use super::{random_max, AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};

/// List share of the next seat in `(d, p)`; 0 for an empty district.
#[inline]
pub(crate) fn list_share(board: &Board<'_>, totals: &[f64], d: usize, p: usize) -> f64 {
    if totals[d] <= 0.0 {
        return 0.0;
    }
    board.votes(d, p) / totals[d] / board.input.rule.divisor_at(board.current[d][p])
}

/// Party with the best national number among those with an open cell.
pub(crate) fn pick_party(board: &Board<'_>, national: &[f64], rng: &mut TieRng) -> Option<(f64, usize)> {
    let seats = matrix::col_sums(&board.current, board.input.parties());
    let cands = (0..board.input.parties())
        .filter(|&p| board.free_col[p] > 0 && (0..board.input.districts()).any(|d| board.is_open(d, p)))
        .map(|p| (national[p] / board.input.rule.divisor_at(seats[p]), p));
    random_max(cands, rng, &format!("seat:{}/party", board.seat))
}

pub fn icelandic_law(
    input: &AdjustmentInput<'_>,
    rng: &mut TieRng,
) -> Result<AdjustmentOutcome, AdjustError> {
    let national = input.national_votes();
    let totals = input.district_totals();
    Board::new(input).fill(|board| {
        let (_, p) = pick_party(board, &national, rng)?;
        let cands = (0..input.districts())
            .filter(|&d| board.is_open(d, p))
            .map(|d| (list_share(board, &totals, d, p), d));
        let (share, d) = random_max(cands, rng, &format!("seat:{}/district", board.seat))?;
        Some((d, p, AwardReason::NationalNumber, share))
    })
}

pub fn icelandic_share_law(
    input: &AdjustmentInput<'_>,
    rng: &mut TieRng,
) -> Result<AdjustmentOutcome, AdjustError> {
    let totals = input.district_totals();
    Board::new(input).fill(|board| {
        let cands: Vec<(f64, (usize, usize))> = board
            .open_cells()
            .map(|(d, p)| (list_share(board, &totals, d, p), (d, p)))
            .collect();
        let (share, (d, p)) = random_max(cands, rng, &format!("seat:{}/cell", board.seat))?;
        Some((d, p, AwardReason::ListShare, share))
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use sa_core::DivisorRule;

    #[test]
    fn national_number_then_list_share() {
        // Party 0 leads nationally; its better list share is in district 1.
        let owned = Owned {
            votes: vec![vec![600.0, 400.0], vec![500.0, 100.0]],
            row_targets: vec![1, 1],
            col_targets: vec![1, 1],
            prior: vec![vec![0, 0], vec![0, 0]],
            rule: DivisorRule::DHondt,
        };
        let mut rng = TieRng::from_seed_u64(3);
        let out = icelandic_law(&owned.input(), &mut rng).unwrap();
        assert_eq!(out.allocation, vec![vec![0, 1], vec![1, 0]]);
        assert_eq!(out.trail[0].party, 0);
        assert_eq!(out.trail[0].district, 1);
        assert!(rng.crumbs().is_empty());
    }

    #[test]
    fn same_seed_same_tie_breaks() {
        let owned = Owned {
            votes: vec![vec![100.0, 100.0], vec![100.0, 100.0]],
            row_targets: vec![1, 1],
            col_targets: vec![1, 1],
            prior: vec![vec![0, 0], vec![0, 0]],
            rule: DivisorRule::DHondt,
        };
        let run = |seed| {
            let mut rng = TieRng::from_seed_u64(seed);
            let out = icelandic_law(&owned.input(), &mut rng).unwrap();
            (out.allocation, rng.crumbs().to_vec())
        };
        let (a, crumbs) = run(11);
        assert_eq!(run(11), (a.clone(), crumbs.clone()));
        assert!(!crumbs.is_empty());
        assert_conserves(&owned.input(), &AdjustmentOutcome { allocation: a, trail: vec![], violating: false });
    }

    #[test]
    fn share_law_ranks_all_cells_together() {
        let owned = three_by_three();
        let mut rng = TieRng::from_seed_u64(5);
        let out = icelandic_share_law(&owned.input(), &mut rng).unwrap();
        assert_conserves(&owned.input(), &out);
        assert!(out.trail.iter().all(|e| e.reason == AwardReason::ListShare));
    }
}
