//! One-dimensional greedy apportionment (highest averages).
//!
//! Contract:
//! - Each candidate starts at `priors[i]` seats; its current divisor is
//!   `divisor_at(priors[i])`, obtained by fast-forwarding a fresh cursor.
//! - Seats are awarded one at a time to the first candidate holding the
//!   strict maximum of `votes / divisor` among candidates with capacity left.
//!   Zero votes, threshold-eliminated entries and exhausted caps score 0.
//! - Only the winner's cursor advances.
//! - When seats remain but every candidate scores 0 the call fails with
//!   `Unsatisfiable { seat }`: the 0-based index of that seat among all
//!   `total_seats`, priors included.
//!
//! The returned cursors are positioned after each candidate's current divisor,
//! so callers can keep awarding seats without restarting the sequences.

use core::fmt;

use sa_core::{DivisorCursor, DivisorRule};

use crate::threshold::filter_votes;

#[derive(Debug, Clone, PartialEq)]
pub enum ApportionError {
    /// No candidate can take the seat with this 0-based index (priors count).
    Unsatisfiable { seat: u32 },
    /// Prior seats already exceed the seat total.
    PriorsExceedSeats { priors: u32, seats: u32 },
    /// `priors`/`caps` length differs from `votes`.
    LengthMismatch { expected: usize, found: usize },
}

impl fmt::Display for ApportionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApportionError::Unsatisfiable { seat } => {
                write!(f, "unsatisfiable allocation: no candidate can take seat {seat}")
            }
            ApportionError::PriorsExceedSeats { priors, seats } => {
                write!(f, "prior seats ({priors}) exceed seat total ({seats})")
            }
            ApportionError::LengthMismatch { expected, found } => {
                write!(f, "length mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for ApportionError {}

/// Result of a 1-D run.
#[derive(Debug, Clone)]
pub struct Apportionment {
    /// Final seats per candidate (priors included).
    pub seats: Vec<u32>,
    /// Divisor each candidate would use for its next seat.
    pub divisors: Vec<f64>,
    /// Cursors positioned after `divisors[i]`.
    pub cursors: Vec<DivisorCursor>,
    /// Smallest divided value used for an awarded seat (`None` when nothing was awarded).
    pub min_used: Option<f64>,
}

impl Apportionment {
    /// Largest divided value that did not win a seat, with the same exclusions as the run.
    pub fn max_unused(&self, votes: &[f64]) -> f64 {
        votes
            .iter()
            .zip(&self.divisors)
            .map(|(&v, &d)| if v > 0.0 { v / d } else { 0.0 })
            .fold(0.0, f64::max)
    }
}

pub(crate) fn check_len(expected: usize, found: usize) -> Result<(), ApportionError> {
    if expected == found {
        Ok(())
    } else {
        Err(ApportionError::LengthMismatch { expected, found })
    }
}

/// Divisor-method apportionment of `total_seats` over `votes`.
///
/// `caps` bounds the seats a candidate may gain in this call (`None` = unbounded).
/// `threshold_pct` zeroes low-share entries before allocating.
pub fn apportion1d(
    votes: &[f64],
    total_seats: u32,
    priors: &[u32],
    rule: DivisorRule,
    caps: Option<&[u32]>,
    threshold_pct: Option<f64>,
) -> Result<Apportionment, ApportionError> {
    check_len(votes.len(), priors.len())?;
    if let Some(c) = caps {
        check_len(votes.len(), c.len())?;
    }
    let prior_sum: u32 = priors.iter().sum();
    if prior_sum > total_seats {
        return Err(ApportionError::PriorsExceedSeats { priors: prior_sum, seats: total_seats });
    }

    let votes = match threshold_pct {
        Some(pct) => filter_votes(votes, pct),
        None => votes.to_vec(),
    };

    let mut seats = priors.to_vec();
    let mut remaining: Vec<u32> = match caps {
        Some(c) => c.to_vec(),
        None => vec![u32::MAX; votes.len()],
    };

    // Fast-forward: after `p + 1` draws the last value is divisor_at(p).
    let mut cursors: Vec<DivisorCursor> = Vec::with_capacity(votes.len());
    let mut divisors: Vec<f64> = Vec::with_capacity(votes.len());
    for &p in priors {
        let mut c = rule.cursor();
        let d = c.advance_by(p + 1).unwrap_or_else(|| rule.divisor_at(p));
        cursors.push(c);
        divisors.push(d);
    }

    let mut min_used: Option<f64> = None;
    for seat in prior_sum..total_seats {
        let mut best: Option<(usize, f64)> = None;
        for (i, (&v, &d)) in votes.iter().zip(&divisors).enumerate() {
            if v <= 0.0 || remaining[i] == 0 {
                continue;
            }
            let q = v / d;
            if best.map_or(true, |(_, b)| q > b) {
                best = Some((i, q));
            }
        }
        let Some((winner, q)) = best else {
            return Err(ApportionError::Unsatisfiable { seat });
        };
        seats[winner] += 1;
        remaining[winner] -= 1;
        divisors[winner] = cursors[winner].advance();
        min_used = Some(min_used.map_or(q, |m| m.min(q)));
    }

    Ok(Apportionment { seats, divisors, cursors, min_used })
}
