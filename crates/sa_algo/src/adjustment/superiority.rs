//! Relative superiority family.
//!
//! - `relative_superiority`: per district with free seats, its best open party
//!   `b1` against the next-best open party `b2`; score `b1/b2` (+∞ when there is
//!   no second open party). Largest score wins; the seat goes to `b1`.
//! - `relative_superiority_simple`: as above, but `b2` is the runner-up among
//!   every party with votes in the district, capacity ignored.
//! - `relative_inferiority`: the same comparison down a party's column: its
//!   best open district against its second-best open district.
//!
//! All ratios use `dv`. Ties keep the first district/party index.

use super::{first_max, AdjustError, AdjustmentInput, AdjustmentOutcome, AwardReason, Board};

/// Best and runner-up `(dv, index)` over `cands`, first index winning ties.
fn top_two(cands: impl Iterator<Item = (f64, usize)>) -> Option<((f64, usize), Option<f64>)> {
    let mut first: Option<(f64, usize)> = None;
    let mut second: Option<f64> = None;
    for (v, i) in cands {
        match first {
            None => first = Some((v, i)),
            Some((b, _)) if v > b => {
                second = Some(b);
                first = Some((v, i));
            }
            Some(_) => {
                if second.map_or(true, |s| v > s) {
                    second = Some(v);
                }
            }
        }
    }
    first.map(|f| (f, second))
}

#[inline]
fn ratio(b1: f64, b2: Option<f64>) -> f64 {
    match b2 {
        Some(b2) if b2 > 0.0 => b1 / b2,
        _ => f64::INFINITY,
    }
}

fn superiority(input: &AdjustmentInput<'_>, simple: bool) -> Result<AdjustmentOutcome, AdjustError> {
    let parties = input.parties();
    Board::new(input).fill(|board| {
        let scored = (0..input.districts()).filter(|&d| board.free_row[d] > 0).filter_map(|d| {
            let open = (0..parties).filter(|&p| board.is_open(d, p)).map(|p| (board.dv(d, p), p));
            let ((b1, p1), open_b2) = top_two(open)?;
            let b2 = if simple {
                top_two(
                    (0..parties)
                        .filter(|&p| p != p1 && board.votes(d, p) > 0.0)
                        .map(|p| (board.dv(d, p), p)),
                )
                .map(|((v, _), _)| v)
            } else {
                open_b2
            };
            Some((ratio(b1, b2), (d, p1)))
        });
        let (score, (d, p)) = first_max(scored)?;
        Some((d, p, AwardReason::Superiority, score))
    })
}

pub fn relative_superiority(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    superiority(input, false)
}

pub fn relative_superiority_simple(
    input: &AdjustmentInput<'_>,
) -> Result<AdjustmentOutcome, AdjustError> {
    superiority(input, true)
}

pub fn relative_inferiority(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    let districts = input.districts();
    Board::new(input).fill(|board| {
        let scored = (0..input.parties()).filter(|&p| board.free_col[p] > 0).filter_map(|p| {
            let open = (0..districts).filter(|&d| board.is_open(d, p)).map(|d| (board.dv(d, p), d));
            let ((b1, d1), b2) = top_two(open)?;
            Some((ratio(b1, b2), (d1, p)))
        });
        let (score, (d, p)) = first_max(scored)?;
        Some((d, p, AwardReason::Inferiority, score))
    })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use sa_core::DivisorRule;

    #[test]
    fn top_two_keeps_first_on_ties() {
        let t = top_two([(5.0, 0), (5.0, 1), (3.0, 2)].into_iter());
        assert_eq!(t, Some(((5.0, 0), Some(5.0))));
        assert_eq!(top_two([(1.0, 4)].into_iter()), Some(((1.0, 4), None)));
    }

    #[test]
    fn biggest_lead_goes_first() {
        // District 0: 300 vs 100 (ratio 3); district 1: 200 vs 190 (ratio ~1.05).
        let owned = Owned {
            votes: vec![vec![300.0, 100.0], vec![200.0, 190.0]],
            row_targets: vec![1, 1],
            col_targets: vec![1, 1],
            prior: vec![vec![0, 0], vec![0, 0]],
            rule: DivisorRule::DHondt,
        };
        let out = relative_superiority(&owned.input()).unwrap();
        assert_eq!(out.trail[0].district, 0);
        assert_eq!(out.trail[0].party, 0);
        assert_eq!(out.allocation, vec![vec![1, 0], vec![0, 1]]);
    }

    #[test]
    fn simple_variant_ignores_capacity_for_runner_up() {
        // Party 1 is full nationally; the simple variant still compares with it.
        let owned = Owned {
            votes: vec![vec![100.0, 400.0, 50.0], vec![100.0, 10.0, 90.0]],
            row_targets: vec![2, 1],
            col_targets: vec![1, 1, 1],
            prior: vec![vec![0, 1, 0], vec![0, 0, 0]],
            rule: DivisorRule::DHondt,
        };
        let input = owned.input();
        let full = relative_superiority(&input).unwrap();
        let simple = relative_superiority_simple(&input).unwrap();
        assert_conserves(&input, &full);
        assert_conserves(&input, &simple);
        // full: d0 ratio 100/50 = 2, d1 ratio 100/90 → d0 gets party 0 first
        assert_eq!(full.trail[0].district, 0);
        // simple: d0 runner-up is party 1 at 400/2 = 200 → ratio 0.5; d1 wins
        assert_eq!(simple.trail[0].district, 1);
    }

    #[test]
    fn inferiority_conserves() {
        let owned = three_by_three();
        let out = relative_inferiority(&owned.input()).unwrap();
        assert_conserves(&owned.input(), &out);
    }
}
