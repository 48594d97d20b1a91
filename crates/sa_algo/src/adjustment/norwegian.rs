//! Norwegian election-law procedures.
//!
//! Score of an open cell: `dv(d, p) / (Σ orig_votes[d] / row_target[d])`,
//! the divided vote relative to the district's votes per seat.
//!
//! `norwegian_law` ranks every open cell by that score;
//! `norwegian_icelandic` picks the party by national number first (as the
//! Icelandic law does) and then its district by the Norwegian score.
//! Ties are random through the seeded `TieRng`.

use sa_core::TieRng;

use super::icelandic::pick_party;
use super::{random_max, AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};

#[inline]
fn votes_per_seat_score(board: &Board<'_>, totals: &[f64], d: usize, p: usize) -> f64 {
    let target = board.input.row_targets[d];
    if totals[d] <= 0.0 || target == 0 {
        return 0.0;
    }
    board.dv(d, p) / (totals[d] / f64::from(target))
}

pub fn norwegian_law(
    input: &AdjustmentInput<'_>,
    rng: &mut TieRng,
) -> Result<AdjustmentOutcome, AdjustError> {
    let totals = input.district_totals();
    Board::new(input).fill(|board| {
        let cands: Vec<(f64, (usize, usize))> = board
            .open_cells()
            .map(|(d, p)| (votes_per_seat_score(board, &totals, d, p), (d, p)))
            .collect();
        let (score, (d, p)) = random_max(cands, rng, &format!("seat:{}/cell", board.seat))?;
        Some((d, p, AwardReason::VotesPerSeat, score))
    })
}

pub fn norwegian_icelandic(
    input: &AdjustmentInput<'_>,
    rng: &mut TieRng,
) -> Result<AdjustmentOutcome, AdjustError> {
    let national = input.national_votes();
    let totals = input.district_totals();
    Board::new(input).fill(|board| {
        let (_, p) = pick_party(board, &national, rng)?;
        let cands = (0..input.districts())
            .filter(|&d| board.is_open(d, p))
            .map(|d| (votes_per_seat_score(board, &totals, d, p), d));
        let (score, d) = random_max(cands, rng, &format!("seat:{}/district", board.seat))?;
        Some((d, p, AwardReason::VotesPerSeat, score))
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use sa_core::DivisorRule;

    #[test]
    fn small_districts_weigh_more() {
        // Same votes for party 0 in both districts, but district 1 has fewer
        // votes per seat, so its score is higher there.
        let owned = Owned {
            votes: vec![vec![100.0, 900.0], vec![100.0, 100.0]],
            row_targets: vec![2, 2],
            col_targets: vec![2, 2],
            prior: vec![vec![0, 1], vec![0, 1]],
            rule: DivisorRule::DHondt,
        };
        let mut rng = TieRng::from_seed_u64(1);
        let out = norwegian_law(&owned.input(), &mut rng).unwrap();
        assert_conserves(&owned.input(), &out);
        assert_eq!(out.allocation, vec![vec![1, 1], vec![1, 1]]);
        assert_eq!(out.trail[0].district, 1);
    }

    #[test]
    fn hybrid_conserves() {
        let owned = three_by_three();
        let mut rng = TieRng::from_seed_u64(2);
        let out = norwegian_icelandic(&owned.input(), &mut rng).unwrap();
        assert_conserves(&owned.input(), &out);
    }
}
