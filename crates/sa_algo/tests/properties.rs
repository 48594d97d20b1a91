//! Property tests: seat conservation, prior monotonicity, replay.

use proptest::prelude::*;

use sa_algo::{adjust, apportion1d, AdjustContext, AdjustError, AdjustmentInput, AwardSequence};
use sa_core::{matrix, AdjustmentMethod, DivisorRule, SeatRule, TieRng};

/// Votes (all positive), constituency seats and adjustment seats per district.
fn table() -> impl Strategy<Value = (Vec<Vec<f64>>, Vec<u32>, Vec<u32>)> {
    (2usize..5, 2usize..5).prop_flat_map(|(rows, cols)| {
        (
            prop::collection::vec(prop::collection::vec(1u32..5_000, cols), rows)
                .prop_map(|m| m.into_iter().map(|r| r.into_iter().map(f64::from).collect()).collect()),
            prop::collection::vec(1u32..6, rows),
            prop::collection::vec(0u32..3, rows),
        )
    })
}

fn rule() -> impl Strategy<Value = DivisorRule> {
    prop::sample::select(DivisorRule::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn every_strategy_conserves_seats((votes, const_seats, adj_seats) in table(), rule in rule(), seed in any::<u64>()) {
        let cols = votes[0].len();
        let prior: Vec<Vec<u32>> = votes
            .iter()
            .zip(&const_seats)
            .map(|(r, &s)| apportion1d(r, s, &vec![0; cols], rule, None, None).unwrap().seats)
            .collect();
        let row_targets: Vec<u32> = const_seats.iter().zip(&adj_seats).map(|(c, a)| c + a).collect();
        let national = matrix::vote_col_totals(&votes, cols);
        let col_targets = apportion1d(
            &national,
            row_targets.iter().sum(),
            &matrix::col_sums(&prior, cols),
            rule,
            None,
            None,
        )
        .unwrap()
        .seats;

        let input = AdjustmentInput {
            votes: &votes,
            orig_votes: &votes,
            row_targets: &row_targets,
            col_targets: &col_targets,
            prior: &prior,
            rule,
        };
        for &method in AdjustmentMethod::ALL {
            if method == AdjustmentMethod::OptEntropy {
                continue;
            }
            let mut rng = TieRng::from_seed_u64(seed);
            let mut ctx = AdjustContext { tie_rng: &mut rng, optimizer: None };
            let out = match adjust(method, &input, &mut ctx) {
                Ok(out) => out,
                // scaling may legitimately fail to settle
                Err(AdjustError::NonConvergence { .. })
                    if matches!(method, AdjustmentMethod::AlternatingScaling | AdjustmentMethod::VarAltScal) =>
                {
                    continue
                }
                Err(e) => return Err(TestCaseError::fail(format!("{method}: {e}"))),
            };
            prop_assert_eq!(matrix::row_sums(&out.allocation), row_targets.clone());
            prop_assert_eq!(matrix::total(&out.allocation), row_targets.iter().sum::<u32>());
            for (row, pr) in out.allocation.iter().zip(&prior) {
                for (a, b) in row.iter().zip(pr) {
                    prop_assert!(a >= b);
                }
            }
            if !out.violating {
                prop_assert_eq!(matrix::col_sums(&out.allocation, cols), col_targets.clone());
            }
        }
    }

    #[test]
    fn law_methods_replay_under_the_same_seed((votes, const_seats, _adj) in table(), seed in any::<u64>()) {
        let cols = votes[0].len();
        let prior = vec![vec![0u32; cols]; votes.len()];
        let national = matrix::vote_col_totals(&votes, cols);
        let col_targets = apportion1d(&national, const_seats.iter().sum(), &vec![0; cols], DivisorRule::DHondt, None, None)
            .unwrap()
            .seats;
        let input = AdjustmentInput {
            votes: &votes,
            orig_votes: &votes,
            row_targets: &const_seats,
            col_targets: &col_targets,
            prior: &prior,
            rule: DivisorRule::DHondt,
        };
        let run = || {
            let mut rng = TieRng::from_seed_u64(seed);
            let mut ctx = AdjustContext { tie_rng: &mut rng, optimizer: None };
            let out = adjust(AdjustmentMethod::IcelandicLaw, &input, &mut ctx);
            (out, rng.crumbs().to_vec())
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn award_sequences_replay(votes in prop::collection::vec(0u32..10_000, 1..6), rule in rule()) {
        let votes: Vec<f64> = votes.into_iter().map(f64::from).collect();
        let priors = vec![0; votes.len()];
        let a: Vec<_> = AwardSequence::new(&votes, &priors, SeatRule::Divisor(rule), 0, None).unwrap().take(20).collect();
        let b: Vec<_> = AwardSequence::new(&votes, &priors, SeatRule::Divisor(rule), 0, None).unwrap().take(20).collect();
        prop_assert_eq!(a, b);
    }
}
