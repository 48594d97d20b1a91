//! Switching (Kristinn Lund's method).
//!
//! 1. Each district fills its free seats on its own: a divisor apportionment,
//!    continuing from the constituency seats, among parties that still needed
//!    seats nationally when the run started.
//! 2. While some party is over its national target and another is under it,
//!    the cheapest transfer `(district, over, under)` is taken from a
//!    min-priority queue keyed by sensitivity
//!    `dv_last(d, over) / dv(d, under)`, where `dv_last` is the divided vote of
//!    the over-party's last seat in that district. Only seats awarded in step 1
//!    can move; constituency seats never do.
//!
//! If parties are still off target and no transfer exists, the allocation is
//! returned as is with `violating = true`.

use core::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::{trace, warn};

use sa_core::{matrix, SeatRule};

use super::{AdjustError, AdjustmentInput, AdjustmentOutcome, AwardEvent, AwardReason};
use crate::sequence::apportion1d_general;

#[derive(Debug, Clone, Copy)]
struct Transfer {
    sensitivity: f64,
    district: usize,
    over: usize,
    under: usize,
}

impl PartialEq for Transfer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Transfer {}

impl PartialOrd for Transfer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transfer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sensitivity
            .total_cmp(&other.sensitivity)
            .then(self.district.cmp(&other.district))
            .then(self.over.cmp(&other.over))
            .then(self.under.cmp(&other.under))
    }
}

pub fn switching(input: &AdjustmentInput<'_>) -> Result<AdjustmentOutcome, AdjustError> {
    let (rows, cols) = (input.districts(), input.parties());
    let rule = input.rule;
    let mut current = input.prior.to_vec();
    let mut adj = matrix::zeros(rows, cols);
    let mut trail: Vec<AwardEvent> = Vec::new();

    // 1) independent district apportionment among parties still short nationally
    let prior_cols = matrix::col_sums(input.prior, cols);
    let short: Vec<bool> = (0..cols).map(|p| prior_cols[p] < input.col_targets[p]).collect();
    for d in 0..rows {
        let row: Vec<f64> = (0..cols)
            .map(|p| if short[p] { input.votes[d][p] } else { 0.0 })
            .collect();
        let g = apportion1d_general(
            &row,
            input.row_targets[d],
            &input.prior[d],
            SeatRule::Divisor(rule),
            None,
            None,
        )
        .map_err(|_| AdjustError::Infeasible { seat: trail.len() as u32, district: d })?;
        for step in g.steps {
            let p = step.candidate;
            current[d][p] += 1;
            adj[d][p] += 1;
            trail.push(AwardEvent {
                seat: trail.len() as u32,
                district: d,
                party: p,
                reason: AwardReason::Initial,
                score: step.value,
                from_party: None,
            });
        }
    }

    // 2) transfers
    let mut violating = false;
    loop {
        let col = matrix::col_sums(&current, cols);
        let over: Vec<usize> = (0..cols).filter(|&p| col[p] > input.col_targets[p]).collect();
        let under: Vec<usize> = (0..cols).filter(|&p| col[p] < input.col_targets[p]).collect();
        if over.is_empty() && under.is_empty() {
            break;
        }

        let mut heap: BinaryHeap<Reverse<Transfer>> = BinaryHeap::new();
        for d in 0..rows {
            for &o in &over {
                if adj[d][o] == 0 {
                    continue;
                }
                let last = input.votes[d][o] / rule.divisor_at(current[d][o] - 1);
                for &u in &under {
                    let v = input.votes[d][u];
                    if v <= 0.0 {
                        continue;
                    }
                    let next = v / rule.divisor_at(current[d][u]);
                    heap.push(Reverse(Transfer { sensitivity: last / next, district: d, over: o, under: u }));
                }
            }
        }

        let Some(Reverse(t)) = heap.pop() else {
            warn!(over = ?over, under = ?under, "switching: no transfer left, targets violated");
            violating = true;
            break;
        };
        trace!(district = t.district, from = t.over, to = t.under, sensitivity = t.sensitivity, "transfer");
        current[t.district][t.over] -= 1;
        adj[t.district][t.over] -= 1;
        current[t.district][t.under] += 1;
        adj[t.district][t.under] += 1;
        trail.push(AwardEvent {
            seat: trail.len() as u32,
            district: t.district,
            party: t.under,
            reason: AwardReason::Transfer,
            score: t.sensitivity,
            from_party: Some(t.over),
        });
    }

    Ok(AdjustmentOutcome { allocation: current, trail, violating })
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use sa_core::DivisorRule;

    #[test]
    fn heap_pops_lowest_sensitivity() {
        let mut h = BinaryHeap::new();
        for (s, d) in [(2.0, 0), (0.5, 1), (1.0, 2)] {
            h.push(Reverse(Transfer { sensitivity: s, district: d, over: 0, under: 1 }));
        }
        assert_eq!(h.pop().map(|Reverse(t)| t.district), Some(1));
    }

    #[test]
    fn over_served_party_hands_a_seat_over() {
        let owned = Owned {
            votes: vec![vec![100.0, 50.0], vec![100.0, 0.0]],
            row_targets: vec![1, 1],
            col_targets: vec![1, 1],
            prior: vec![vec![0, 0], vec![0, 0]],
            rule: DivisorRule::DHondt,
        };
        let out = switching(&owned.input()).unwrap();
        assert!(!out.violating);
        assert_eq!(out.allocation, vec![vec![0, 1], vec![1, 0]]);
        let last = out.trail.last().unwrap();
        assert_eq!(last.reason, AwardReason::Transfer);
        assert_eq!(last.from_party, Some(0));
        assert_eq!(last.score, 2.0);
    }

    #[test]
    fn no_possible_transfer_is_flagged() {
        let owned = Owned {
            votes: vec![vec![100.0, 0.0], vec![100.0, 0.0]],
            row_targets: vec![1, 1],
            col_targets: vec![1, 1],
            prior: vec![vec![0, 0], vec![0, 0]],
            rule: DivisorRule::DHondt,
        };
        let out = switching(&owned.input()).unwrap();
        assert!(out.violating);
        assert_eq!(out.allocation, vec![vec![1, 0], vec![1, 0]]);
    }

    #[test]
    fn conserves_on_full_table() {
        let owned = three_by_three();
        let out = switching(&owned.input()).unwrap();
        assert!(!out.violating);
        assert_conserves(&owned.input(), &out);
    }

    #[test]
    fn constituency_seats_never_move() {
        let owned = Owned {
            votes: vec![vec![100.0, 80.0], vec![100.0, 10.0]],
            row_targets: vec![2, 2],
            col_targets: vec![3, 1],
            prior: vec![vec![1, 0], vec![1, 0]],
            rule: DivisorRule::DHondt,
        };
        let out = switching(&owned.input()).unwrap();
        assert_conserves(&owned.input(), &out);
        assert!(out.allocation[0][0] >= 1 && out.allocation[1][0] >= 1);
    }
}
