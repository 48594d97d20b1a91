//! Replayable award sequences.
//!
//! `AwardSequence` is the lazy form of the 1-D apportioner: an iterator of
//! "next seat goes to candidate i at value x" events with no fixed seat total.
//! Constructing a new sequence from the same inputs always replays the same
//! events, because divisor values are closed-form in the seats held and the
//! quota flavour only depends on its running totals.
//!
//! Flavours:
//! - divisor: value = `votes[i] / divisor_at(seats[i])`;
//! - quota (largest remainder): running value starts at `votes[i] - prior[i]*quota`,
//!   each award yields the running value and then subtracts one quota.
//!
//! Candidates with zero votes or no remaining capacity are never awarded; the
//! sequence ends when none is left. Ties go to the first index.

use sa_core::{DivisorRule, SeatRule};

use crate::apportion::{check_len, ApportionError};
use crate::threshold::filter_votes;

/// One seat award.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AwardStep {
    pub candidate: usize,
    pub value: f64,
}

#[derive(Debug, Clone)]
enum Source {
    Divisor(DivisorRule),
    Quota { running: Vec<f64> },
}

#[derive(Debug, Clone)]
pub struct AwardSequence {
    votes: Vec<f64>,
    seats: Vec<u32>,
    remaining: Vec<u32>,
    quota: f64,
    source: Source,
}

impl AwardSequence {
    /// Fresh sequence. `seats_for_quota` only matters for quota rules
    /// (the quota is computed once from `Σ votes` and that seat count).
    pub fn new(
        votes: &[f64],
        priors: &[u32],
        rule: SeatRule,
        seats_for_quota: u32,
        caps: Option<&[u32]>,
    ) -> Result<Self, ApportionError> {
        check_len(votes.len(), priors.len())?;
        if let Some(c) = caps {
            check_len(votes.len(), c.len())?;
        }
        let remaining = caps.map_or_else(|| vec![u32::MAX; votes.len()], <[u32]>::to_vec);
        let (quota, source) = match rule {
            SeatRule::Divisor(d) => (0.0, Source::Divisor(d)),
            SeatRule::Quota(q) => {
                let quota = q.quota(votes.iter().sum(), seats_for_quota);
                let running =
                    votes.iter().zip(priors).map(|(&v, &p)| v - f64::from(p) * quota).collect();
                (quota, Source::Quota { running })
            }
        };
        Ok(Self { votes: votes.to_vec(), seats: priors.to_vec(), remaining, quota, source })
    }

    /// Seats held so far (priors plus everything yielded).
    pub fn seats(&self) -> &[u32] {
        &self.seats
    }

    /// Value the candidate would be awarded at next. Divisor values are never
    /// negative; a quota remainder can be once priors exceed the candidate's
    /// quotas. Returns 0 for a candidate without votes or capacity.
    pub fn next_value(&self, i: usize) -> f64 {
        if self.votes[i] <= 0.0 || self.remaining[i] == 0 {
            return 0.0;
        }
        match &self.source {
            Source::Divisor(rule) => self.votes[i] / rule.divisor_at(self.seats[i]),
            Source::Quota { running } => running[i],
        }
    }

    /// What the next award would be, without taking it.
    pub fn peek(&self) -> Option<AwardStep> {
        let mut best: Option<AwardStep> = None;
        for i in 0..self.votes.len() {
            if self.votes[i] <= 0.0 || self.remaining[i] == 0 {
                continue;
            }
            let value = self.next_value(i);
            if best.map_or(true, |b| value > b.value) {
                best = Some(AwardStep { candidate: i, value });
            }
        }
        best
    }
}

impl Iterator for AwardSequence {
    type Item = AwardStep;

    fn next(&mut self) -> Option<AwardStep> {
        let step = self.peek()?;
        let i = step.candidate;
        self.seats[i] += 1;
        self.remaining[i] -= 1;
        if let Source::Quota { running } = &mut self.source {
            running[i] -= self.quota;
        }
        Some(step)
    }
}

/// Outcome of `apportion1d_general`.
#[derive(Debug, Clone)]
pub struct GeneralApportionment {
    pub seats: Vec<u32>,
    /// Awards in the order they were made (priors excluded).
    pub steps: Vec<AwardStep>,
    /// Smallest value used (`None` when nothing was awarded).
    pub min_used: Option<f64>,
}

/// 1-D apportionment over either rule family, by draining an `AwardSequence`.
pub fn apportion1d_general(
    votes: &[f64],
    total_seats: u32,
    priors: &[u32],
    rule: SeatRule,
    caps: Option<&[u32]>,
    threshold_pct: Option<f64>,
) -> Result<GeneralApportionment, ApportionError> {
    let prior_sum: u32 = priors.iter().sum();
    if prior_sum > total_seats {
        return Err(ApportionError::PriorsExceedSeats { priors: prior_sum, seats: total_seats });
    }
    let votes = match threshold_pct {
        Some(pct) => filter_votes(votes, pct),
        None => votes.to_vec(),
    };
    let mut seq = AwardSequence::new(&votes, priors, rule, total_seats, caps)?;
    let wanted = total_seats - prior_sum;
    let steps: Vec<AwardStep> = seq.by_ref().take(wanted as usize).collect();
    if steps.len() < wanted as usize {
        return Err(ApportionError::Unsatisfiable { seat: prior_sum + steps.len() as u32 });
    }
    let min_used = steps.iter().map(|s| s.value).reduce(f64::min);
    Ok(GeneralApportionment { seats: seq.seats().to_vec(), steps, min_used })
}
