//! Pure vote ratios: rank open cells by the district's share of the party's
//! national vote, divided by the cell's next divisor. First cell wins ties.

use super::{first_max, AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};

pub fn pure_vote_ratios(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    let national = input.national_votes();
    Board::new(input).fill(|board| {
        let scored = board.open_cells().map(|(d, p)| {
            let share = if national[p] > 0.0 { board.votes(d, p) / national[p] } else { 0.0 };
            (share / input.rule.divisor_at(board.current[d][p]), (d, p))
        });
        let (score, (d, p)) = first_max(scored)?;
        Some((d, p, AwardReason::VoteRatio, score))
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use sa_core::DivisorRule;

    #[test]
    fn strongholds_first() {
        // Party 1's district-1 list holds 90 % of its national vote.
        let owned = Owned {
            votes: vec![vec![500.0, 10.0], vec![500.0, 90.0]],
            row_targets: vec![1, 1],
            col_targets: vec![1, 1],
            prior: vec![vec![0, 0], vec![0, 0]],
            rule: DivisorRule::DHondt,
        };
        let out = pure_vote_ratios(&owned.input()).unwrap();
        assert_eq!((out.trail[0].district, out.trail[0].party), (1, 1));
        assert_eq!(out.allocation, vec![vec![1, 0], vec![0, 1]]);
    }
}
