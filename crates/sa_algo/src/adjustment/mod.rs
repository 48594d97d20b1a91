//! Adjustment-seat strategies.
//!
//! Every strategy consumes the same `AdjustmentInput` (threshold-eliminated
//! votes, the unfiltered votes, row/column seat targets, the constituency
//! allocation as priors, the allocation divisor rule) and returns an
//! `AdjustmentOutcome`: the final allocation, the ordered audit trail of seat
//! awards and the `violating` flag (only Switching may set it).
//!
//! Dispatch is a single exhaustive `match` over `AdjustmentMethod`.
//!
//! Shared vocabulary (used by all greedy strategies through `Board`):
//! - `free_row[d] = row_target[d] − Σ current[d]`,
//! - `free_col[p] = col_target[p] − Σ_d current[d][p]`,
//! - a cell is *open* when both are positive and `votes[d][p] > 0`,
//! - `dv(d, p) = votes[d][p] / divisor_at(current[d][p])`.
//!
//! A district with free seats but no open cell is `Infeasible`.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use sa_core::{matrix, AdjustmentMethod, AllocationMatrix, DivisorRule, TieRng};

pub mod alternating_scaling;
pub mod icelandic;
pub mod monge;
pub mod nearest_neighbor;
pub mod norwegian;
pub mod opt_entropy;
pub mod superiority;
pub mod switching;
pub mod vote_ratios;

pub use opt_entropy::{EntropyOptimizer, EntropyProblem};

// ----------------------------- Inputs / outputs -----------------------------

#[derive(Debug, Clone, Copy)]
pub struct AdjustmentInput<'a> {
    /// District × party votes after threshold elimination.
    pub votes: &'a [Vec<f64>],
    /// District × party votes before elimination (list shares use these totals).
    pub orig_votes: &'a [Vec<f64>],
    /// Total seats per district.
    pub row_targets: &'a [u32],
    /// Total seats per party.
    pub col_targets: &'a [u32],
    /// Constituency allocation; never reduced.
    pub prior: &'a [Vec<u32>],
    pub rule: DivisorRule,
}

impl AdjustmentInput<'_> {
    #[inline]
    pub fn districts(&self) -> usize {
        self.votes.len()
    }

    #[inline]
    pub fn parties(&self) -> usize {
        self.col_targets.len()
    }

    /// National (eliminated) votes per party.
    pub fn national_votes(&self) -> Vec<f64> {
        matrix::vote_col_totals(self.votes, self.parties())
    }

    /// Unfiltered vote total per district.
    pub fn district_totals(&self) -> Vec<f64> {
        matrix::vote_row_totals(self.orig_votes)
    }

    fn check(&self) -> Result<(), AdjustError> {
        let (rows, cols) = (self.districts(), self.parties());
        let bad = |what: &str| Err(AdjustError::InvalidInput(what.to_owned()));
        if self.orig_votes.len() != rows || self.row_targets.len() != rows || self.prior.len() != rows {
            return bad("district dimension mismatch");
        }
        if matrix::check_shape(self.votes, cols).is_err()
            || matrix::check_shape(self.orig_votes, cols).is_err()
            || matrix::check_shape(self.prior, cols).is_err()
        {
            return bad("party dimension mismatch");
        }
        for (d, row) in self.prior.iter().enumerate() {
            if row.iter().sum::<u32>() > self.row_targets[d] {
                return Err(AdjustError::InvalidInput(format!(
                    "district {d}: constituency seats exceed its target"
                )));
            }
        }
        Ok(())
    }
}

/// Why a seat was awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardReason {
    /// Scaled divided vote crossed 1.0 (alternating scaling).
    ScaledVotes,
    /// Party chosen by national number, district by list share.
    NationalNumber,
    /// Best list share over all open cells.
    ListShare,
    /// Best divided vote relative to the district's votes per seat.
    VotesPerSeat,
    /// Largest minimum cross ratio.
    CrossRatio,
    /// Largest lead over the runner-up party in the district.
    Superiority,
    /// Largest lead over the party's second-best district.
    Inferiority,
    /// Largest gap to the ideal fractional allocation.
    NearestIdeal,
    /// Initial per-district allocation before switching.
    Initial,
    /// Seat moved from an over-served party.
    Transfer,
    /// Best share of the party's national vote.
    VoteRatio,
    /// Returned by the external optimizer.
    Optimizer,
}

impl fmt::Display for AwardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AwardReason::ScaledVotes => "scaled votes",
            AwardReason::NationalNumber => "national number",
            AwardReason::ListShare => "list share",
            AwardReason::VotesPerSeat => "votes per seat",
            AwardReason::CrossRatio => "cross ratio",
            AwardReason::Superiority => "superiority",
            AwardReason::Inferiority => "inferiority",
            AwardReason::NearestIdeal => "nearest ideal",
            AwardReason::Initial => "initial",
            AwardReason::Transfer => "transfer",
            AwardReason::VoteRatio => "vote ratio",
            AwardReason::Optimizer => "optimizer",
        };
        f.write_str(s)
    }
}

/// One adjustment-seat award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardEvent {
    /// 0-based adjustment seat number.
    pub seat: u32,
    pub district: usize,
    pub party: usize,
    pub reason: AwardReason,
    pub score: f64,
    /// Party that lost the seat (transfers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_party: Option<usize>,
}

pub type AuditTrail = Vec<AwardEvent>;

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentOutcome {
    pub allocation: AllocationMatrix,
    pub trail: AuditTrail,
    /// Column targets could not all be met (Switching's last resort).
    pub violating: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdjustError {
    /// District `district` still needs seats but has no open cell.
    Infeasible { seat: u32, district: usize },
    /// Iterative scaling did not settle within its round budget.
    NonConvergence { rounds: u32 },
    /// `opt-entropy` was requested without an optimizer.
    OptimizerUnavailable,
    /// The optimizer failed or returned an allocation that breaks the targets.
    Optimizer(String),
    /// Shapes or priors inconsistent with targets.
    InvalidInput(String),
}

impl fmt::Display for AdjustError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustError::Infeasible { seat, district } => write!(
                f,
                "infeasible: adjustment seat {seat} cannot be placed in district {district}"
            ),
            AdjustError::NonConvergence { rounds } => {
                write!(f, "scaling did not converge within {rounds} rounds")
            }
            AdjustError::OptimizerUnavailable => f.write_str("no entropy optimizer configured"),
            AdjustError::Optimizer(m) => write!(f, "optimizer: {m}"),
            AdjustError::InvalidInput(m) => write!(f, "invalid adjustment input: {m}"),
        }
    }
}

impl std::error::Error for AdjustError {}

/// Collaborators a run may need.
pub struct AdjustContext<'a> {
    /// Random ties (Icelandic/Norwegian family only).
    pub tie_rng: &'a mut TieRng,
    pub optimizer: Option<&'a dyn EntropyOptimizer>,
}

// ----------------------------- Dispatch -----------------------------

/// Run `method` on `input`.
pub fn adjust(
    method: AdjustmentMethod,
    input: &AdjustmentInput<'_>,
    ctx: &mut AdjustContext<'_>,
) -> Result<AdjustmentOutcome, AdjustError> {
    input.check()?;
    debug!(method = %method, districts = input.districts(), parties = input.parties(), "adjustment start");
    let out = match method {
        AdjustmentMethod::AlternatingScaling => alternating_scaling::alternating_scaling(input),
        AdjustmentMethod::VarAltScal => alternating_scaling::var_alt_scal(input),
        AdjustmentMethod::IcelandicLaw => icelandic::icelandic_law(input, ctx.tie_rng),
        AdjustmentMethod::IcelandicShareLaw => icelandic::icelandic_share_law(input, ctx.tie_rng),
        AdjustmentMethod::NorwegianLaw => norwegian::norwegian_law(input, ctx.tie_rng),
        AdjustmentMethod::NorwegianIcelandic => norwegian::norwegian_icelandic(input, ctx.tie_rng),
        AdjustmentMethod::Monge => monge::monge(input),
        AdjustmentMethod::RelativeSuperiority => superiority::relative_superiority(input),
        AdjustmentMethod::RelativeSuperioritySimple => {
            superiority::relative_superiority_simple(input)
        }
        AdjustmentMethod::RelativeInferiority => superiority::relative_inferiority(input),
        AdjustmentMethod::NearestNeighbor => nearest_neighbor::nearest_neighbor(input),
        AdjustmentMethod::Switching => switching::switching(input),
        AdjustmentMethod::PureVoteRatios => vote_ratios::pure_vote_ratios(input),
        AdjustmentMethod::OptEntropy => opt_entropy::opt_entropy(input, ctx.optimizer),
    }?;
    debug!(method = %method, awards = out.trail.len(), violating = out.violating, "adjustment done");
    Ok(out)
}

// ----------------------------- Shared board -----------------------------

/// Current allocation plus free capacities, for strategies that award one seat at a time.
#[derive(Debug, Clone)]
pub(crate) struct Board<'a> {
    pub input: &'a AdjustmentInput<'a>,
    pub current: AllocationMatrix,
    pub free_row: Vec<u32>,
    pub free_col: Vec<u32>,
    pub trail: AuditTrail,
    pub seat: u32,
}

impl<'a> Board<'a> {
    pub fn new(input: &'a AdjustmentInput<'a>) -> Self {
        let current = input.prior.to_vec();
        let free_row = input
            .row_targets
            .iter()
            .zip(matrix::row_sums(&current))
            .map(|(&t, s)| t.saturating_sub(s))
            .collect();
        let free_col = input
            .col_targets
            .iter()
            .zip(matrix::col_sums(&current, input.parties()))
            .map(|(&t, s)| t.saturating_sub(s))
            .collect();
        Self { input, current, free_row, free_col, trail: Vec::new(), seat: 0 }
    }

    #[inline]
    pub fn votes(&self, d: usize, p: usize) -> f64 {
        self.input.votes[d][p]
    }

    #[inline]
    pub fn is_open(&self, d: usize, p: usize) -> bool {
        self.free_row[d] > 0 && self.free_col[p] > 0 && self.votes(d, p) > 0.0
    }

    /// Divided vote of the next seat in this cell.
    #[inline]
    pub fn dv(&self, d: usize, p: usize) -> f64 {
        self.votes(d, p) / self.input.rule.divisor_at(self.current[d][p])
    }

    pub fn open_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.input.parties();
        (0..self.input.districts())
            .flat_map(move |d| (0..cols).map(move |p| (d, p)))
            .filter(|&(d, p)| self.is_open(d, p))
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.free_row.iter().all(|&f| f == 0)
    }

    /// First district that needs seats but has no open cell.
    pub fn stuck_district(&self) -> Option<usize> {
        (0..self.input.districts())
            .find(|&d| self.free_row[d] > 0 && !(0..self.input.parties()).any(|p| self.is_open(d, p)))
    }

    pub fn infeasible(&self, district: usize) -> AdjustError {
        AdjustError::Infeasible { seat: self.seat, district }
    }

    pub fn award(&mut self, d: usize, p: usize, reason: AwardReason, score: f64) {
        trace!(seat = self.seat, district = d, party = p, %reason, score, "award");
        self.current[d][p] += 1;
        self.free_row[d] = self.free_row[d].saturating_sub(1);
        self.free_col[p] = self.free_col[p].saturating_sub(1);
        self.trail.push(AwardEvent { seat: self.seat, district: d, party: p, reason, score, from_party: None });
        self.seat += 1;
    }

    pub fn finish(self) -> AdjustmentOutcome {
        AdjustmentOutcome { allocation: self.current, trail: self.trail, violating: false }
    }

    /// Award seats until every district is full, asking `pick` for each one.
    /// `pick` returns `(district, party, reason, score)` or `None` when nothing is open.
    pub fn fill<F>(mut self, mut pick: F) -> Result<AdjustmentOutcome, AdjustError>
    where
        F: FnMut(&Board<'a>) -> Option<(usize, usize, AwardReason, f64)>,
    {
        while !self.done() {
            if let Some(d) = self.stuck_district() {
                return Err(self.infeasible(d));
            }
            let Some((d, p, reason, score)) = pick(&self) else {
                let d = self.free_row.iter().position(|&f| f > 0).unwrap_or(0);
                return Err(self.infeasible(d));
            };
            self.award(d, p, reason, score);
        }
        Ok(self.finish())
    }
}

// ----------------------------- Selection helpers -----------------------------

/// First candidate with the largest key (`None` when empty).
pub(crate) fn first_max<T: Copy>(cands: impl IntoIterator<Item = (f64, T)>) -> Option<(f64, T)> {
    let mut best: Option<(f64, T)> = None;
    for (k, t) in cands {
        if best.map_or(true, |(b, _)| k > b) {
            best = Some((k, t));
        }
    }
    best
}

/// Largest key with exact ties settled by `rng`; every decision is logged under `ctx`.
pub(crate) fn random_max<T: Copy>(
    cands: impl IntoIterator<Item = (f64, T)>,
    rng: &mut TieRng,
    ctx: &str,
) -> Option<(f64, T)> {
    let mut best_key = f64::NEG_INFINITY;
    let mut tied: Vec<T> = Vec::new();
    for (k, t) in cands {
        if k > best_key {
            best_key = k;
            tied.clear();
            tied.push(t);
        } else if k == best_key {
            tied.push(t);
        }
    }
    let pick = rng.pick_tied(ctx, tied.len())?;
    Some((best_key, tied[pick]))
}

/// Build an audit trail for a finished allocation: one event per seat above
/// the prior, ordered by descending score.
pub(crate) fn trail_from_allocation(
    input: &AdjustmentInput<'_>,
    allocation: &[Vec<u32>],
    reason: AwardReason,
    score: impl Fn(usize, usize, u32) -> f64,
) -> AuditTrail {
    let mut awards: Vec<(f64, usize, usize)> = Vec::new();
    for (d, row) in allocation.iter().enumerate() {
        for (p, &s) in row.iter().enumerate() {
            for k in input.prior[d][p]..s {
                awards.push((score(d, p, k), d, p));
            }
        }
    }
    awards.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    awards
        .into_iter()
        .enumerate()
        .map(|(i, (score, district, party))| AwardEvent {
            seat: i as u32,
            district,
            party,
            reason,
            score,
            from_party: None,
        })
        .collect()
}
