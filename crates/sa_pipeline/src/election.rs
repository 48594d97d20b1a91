//! crates/sa_pipeline/src/election.rs
//! One election under one ruleset.
//!
//! Stages run strictly in order, each consuming the previous stage's value:
//!   PrimaryApportionment → ThresholdElimination → AdjustmentSeatCount →
//!   AdjustmentApportionment → Done (`ElectionResult`).
//!
//! Input is validated and the ruleset's seat-spec option applied once, in
//! `Election::new`; the stages never re-check it.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use sa_algo::{
    adjust, apportion1d_general, metrics, threshold, AdjustContext, AdjustError, AdjustmentInput,
    ApportionError, AuditTrail, EntropyOptimizer,
};
use sa_core::{
    matrix, AdjustmentMethod, AllocationMatrix, DistrictName, PartyName, Rules, RulesError,
    RulesetName, SeatSpec, SeatSpecOption, TieCrumb, TieRng, VoteMatrix,
};

use crate::validate::{validate, ValidationReport};

// ---------------------------- Input ----------------------------

/// District record: name plus seats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub name: DistrictName,
    #[serde(flatten)]
    pub seats: SeatSpec,
}

/// Everything an election needs besides the rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionInput {
    pub parties: Vec<PartyName>,
    pub districts: Vec<District>,
    /// District × party.
    pub votes: VoteMatrix,
}

impl ElectionInput {
    /// Same parties and districts, different votes (simulation iterations).
    pub fn with_votes(&self, votes: VoteMatrix) -> Self {
        Self { parties: self.parties.clone(), districts: self.districts.clone(), votes }
    }

    pub fn seat_specs(&self) -> Vec<SeatSpec> {
        self.districts.iter().map(|d| d.seats).collect()
    }

    pub fn total_seats(&self) -> u32 {
        self.districts.iter().map(|d| d.seats.total()).sum()
    }
}

// ---------------------------- Stages & errors ----------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PrimaryApportionment,
    ThresholdElimination,
    AdjustmentSeatCount,
    AdjustmentApportionment,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::PrimaryApportionment => "primary apportionment",
            Stage::ThresholdElimination => "threshold elimination",
            Stage::AdjustmentSeatCount => "adjustment seat count",
            Stage::AdjustmentApportionment => "adjustment apportionment",
            Stage::Done => "done",
        })
    }
}

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("{stage} ({context}): {source}")]
    Apportion {
        stage: Stage,
        context: String,
        #[source]
        source: ApportionError,
    },

    #[error("adjustment apportionment: {0}")]
    Adjust(#[from] AdjustError),
}

impl ElectionError {
    /// Structural failure of the seat targets (as opposed to bad input).
    pub fn is_infeasible(&self) -> bool {
        matches!(
            self,
            ElectionError::Apportion { .. }
                | ElectionError::Adjust(AdjustError::Infeasible { .. })
                | ElectionError::Adjust(AdjustError::NonConvergence { .. })
        )
    }
}

// ---------------------------- Result ----------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ElectionResult {
    pub ruleset: RulesetName,
    pub method: AdjustmentMethod,
    pub parties: Vec<PartyName>,
    /// Districts after the seat-spec option was applied.
    pub districts: Vec<District>,
    pub votes: VoteMatrix,
    pub const_alloc: AllocationMatrix,
    pub adj_alloc: AllocationMatrix,
    pub total_alloc: AllocationMatrix,
    pub row_targets: Vec<u32>,
    pub col_targets: Vec<u32>,
    pub trail: AuditTrail,
    pub violating: bool,
    pub entropy: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tie_crumbs: Vec<TieCrumb>,
}

impl ElectionResult {
    pub fn party_totals(&self) -> Vec<u32> {
        matrix::col_sums(&self.total_alloc, self.parties.len())
    }

    pub fn party_votes(&self) -> Vec<f64> {
        matrix::vote_col_totals(&matrix::to_f64(&self.votes), self.parties.len())
    }
}

// ---------------------------- Election ----------------------------

#[derive(Debug, Clone)]
pub struct Election {
    input: ElectionInput,
    rules: Rules,
}

impl Election {
    /// Validate `input` against `rules` and apply the seat-spec option.
    pub fn new(input: &ElectionInput, rules: &Rules) -> Result<Self, ElectionError> {
        let report = validate(input, rules);
        if !report.pass {
            return Err(ElectionError::Validation(report));
        }
        let seats = rules.apply_seat_spec(&input.seat_specs())?;
        let input = if rules.seat_spec_option() == SeatSpecOption::OneConst {
            let name: DistrictName = "National"
                .parse()
                .map_err(|e: sa_core::CoreError| RulesError::Consistency(e.to_string()))?;
            ElectionInput {
                parties: input.parties.clone(),
                districts: vec![District { name, seats: seats[0] }],
                votes: vec![national_row(&input.votes, input.parties.len())],
            }
        } else {
            ElectionInput {
                parties: input.parties.clone(),
                districts: input
                    .districts
                    .iter()
                    .zip(seats)
                    .map(|(d, seats)| District { name: d.name.clone(), seats })
                    .collect(),
                votes: input.votes.clone(),
            }
        };
        Ok(Self { input, rules: rules.clone() })
    }

    /// Effective input (after the seat-spec option).
    pub fn input(&self) -> &ElectionInput {
        &self.input
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Run every stage. `stream` selects the tie-break stream (simulation iteration).
    pub fn run(
        &self,
        stream: u64,
        optimizer: Option<&dyn EntropyOptimizer>,
    ) -> Result<ElectionResult, ElectionError> {
        let mut tie_rng = TieRng::from_seed_and_stream(self.rules.tie_seed(), stream);
        let mut ctx = AdjustContext { tie_rng: &mut tie_rng, optimizer };
        let mut result = self
            .primary()?
            .eliminate(self)
            .count_seats(self)?
            .apportion(self, &mut ctx)?;
        result.tie_crumbs = tie_rng.crumbs().to_vec();
        Ok(result)
    }

    /// Stage 1: constituency seats, district by district.
    pub fn primary(&self) -> Result<PrimaryApportionment, ElectionError> {
        let cols = self.input.parties.len();
        let zeros = vec![0u32; cols];
        let rule = self.rules.primary_divider();
        let pct = self.rules.constituency_threshold();
        let mut const_alloc = Vec::with_capacity(self.input.districts.len());
        for (district, row) in self.input.districts.iter().zip(&self.input.votes) {
            let votes: Vec<f64> = row.iter().map(|&v| v as f64).collect();
            let g = apportion1d_general(
                &votes,
                district.seats.constituency_seats,
                &zeros,
                rule,
                None,
                Some(pct),
            )
            .map_err(|source| ElectionError::Apportion {
                stage: Stage::PrimaryApportionment,
                context: format!("district {}", district.name),
                source,
            })?;
            const_alloc.push(g.seats);
        }
        debug!(stage = %Stage::PrimaryApportionment, seats = matrix::total(&const_alloc), "stage done");
        Ok(PrimaryApportionment { const_alloc })
    }
}

fn national_row(votes: &[Vec<u64>], cols: usize) -> Vec<u64> {
    let mut out = vec![0u64; cols];
    for row in votes {
        for (p, &v) in row.iter().enumerate() {
            out[p] += v;
        }
    }
    out
}

/// Output of stage 1.
#[derive(Debug, Clone)]
pub struct PrimaryApportionment {
    pub const_alloc: AllocationMatrix,
}

impl PrimaryApportionment {
    /// Stage 2: national threshold on the vote matrix.
    pub fn eliminate(self, election: &Election) -> ThresholdElimination {
        let votes = matrix::to_f64(&election.input.votes);
        let eliminated = threshold::national_filter(&votes, election.rules.adjustment_threshold());
        debug!(stage = %Stage::ThresholdElimination, "stage done");
        ThresholdElimination { const_alloc: self.const_alloc, votes, eliminated }
    }
}

/// Output of stage 2.
#[derive(Debug, Clone)]
pub struct ThresholdElimination {
    pub const_alloc: AllocationMatrix,
    /// Unfiltered votes.
    pub votes: Vec<Vec<f64>>,
    /// Votes with below-threshold parties zeroed.
    pub eliminated: Vec<Vec<f64>>,
}

impl ThresholdElimination {
    /// Stage 3: row targets are district totals; column targets apportion all
    /// seats nationally, keeping constituency seats as priors.
    pub fn count_seats(self, election: &Election) -> Result<AdjustmentSeatCount, ElectionError> {
        let cols = election.input.parties.len();
        let row_targets: Vec<u32> = election.input.districts.iter().map(|d| d.seats.total()).collect();
        let national = matrix::vote_col_totals(&self.eliminated, cols);
        let priors = matrix::col_sums(&self.const_alloc, cols);
        let col_targets = apportion1d_general(
            &national,
            row_targets.iter().sum(),
            &priors,
            election.rules.adj_determine_divider(),
            None,
            None,
        )
        .map_err(|source| ElectionError::Apportion {
            stage: Stage::AdjustmentSeatCount,
            context: "national".into(),
            source,
        })?
        .seats;
        debug!(stage = %Stage::AdjustmentSeatCount, ?col_targets, "stage done");
        Ok(AdjustmentSeatCount {
            const_alloc: self.const_alloc,
            votes: self.votes,
            eliminated: self.eliminated,
            row_targets,
            col_targets,
        })
    }
}

/// Output of stage 3.
#[derive(Debug, Clone)]
pub struct AdjustmentSeatCount {
    pub const_alloc: AllocationMatrix,
    pub votes: Vec<Vec<f64>>,
    pub eliminated: Vec<Vec<f64>>,
    pub row_targets: Vec<u32>,
    pub col_targets: Vec<u32>,
}

impl AdjustmentSeatCount {
    /// Stage 4: hand everything to the configured strategy.
    pub fn apportion(
        self,
        election: &Election,
        ctx: &mut AdjustContext<'_>,
    ) -> Result<ElectionResult, ElectionError> {
        let rules = &election.rules;
        let input = AdjustmentInput {
            votes: &self.eliminated,
            orig_votes: &self.votes,
            row_targets: &self.row_targets,
            col_targets: &self.col_targets,
            prior: &self.const_alloc,
            rule: rules.adj_alloc_divider(),
        };
        let out = adjust(rules.adjustment_method(), &input, ctx)?;
        let adj_alloc = matrix::difference(&out.allocation, &self.const_alloc);
        let entropy = metrics::entropy(&self.eliminated, &out.allocation, rules.adj_alloc_divider());
        debug!(stage = %Stage::AdjustmentApportionment, violating = out.violating, entropy, "stage done");
        Ok(ElectionResult {
            ruleset: rules.name().clone(),
            method: rules.adjustment_method(),
            parties: election.input.parties.clone(),
            districts: election.input.districts.clone(),
            votes: election.input.votes.clone(),
            const_alloc: self.const_alloc,
            adj_alloc,
            total_alloc: out.allocation,
            row_targets: self.row_targets,
            col_targets: self.col_targets,
            trail: out.trail,
            violating: out.violating,
            entropy,
            tie_crumbs: Vec::new(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_input() -> ElectionInput {
        let d = |name: &str, c, a| District {
            name: name.parse().unwrap(),
            seats: SeatSpec { constituency_seats: c, adjustment_seats: a },
        };
        ElectionInput {
            parties: ["A", "B", "C", "D"].iter().map(|p| p.parse().unwrap()).collect(),
            districts: vec![d("North", 5, 1), d("South", 4, 1), d("East", 3, 1)],
            votes: vec![
                vec![4000, 3000, 2000, 500],
                vec![2000, 3400, 1500, 300],
                vec![1500, 1000, 2500, 200],
            ],
        }
    }

    fn rules_with(method: &str) -> Rules {
        Rules::default().with_setting("adjustment_method", method).unwrap()
    }

    #[test]
    fn stages_compose_into_a_consistent_result() {
        let e = Election::new(&sample_input(), &Rules::default()).unwrap();
        let r = e.run(0, None).unwrap();
        assert_eq!(matrix::row_sums(&r.total_alloc), vec![6, 5, 4]);
        assert_eq!(r.party_totals(), r.col_targets);
        assert_eq!(matrix::total(&r.const_alloc), 12);
        assert_eq!(matrix::total(&r.adj_alloc), 3);
        // D is below 5 % nationally and wins nothing
        assert_eq!(r.party_totals()[3], 0);
        assert_eq!(r.col_targets, vec![6, 5, 4, 0]);
        assert_eq!(r.trail.len(), 3);
    }

    #[test]
    fn primary_uses_each_district_alone() {
        let e = Election::new(&sample_input(), &Rules::default()).unwrap();
        let p = e.primary().unwrap();
        assert_eq!(p.const_alloc[0], vec![2, 2, 1, 0]);
    }

    #[test]
    fn every_method_runs_on_the_sample() {
        for &m in AdjustmentMethod::ALL {
            if m == AdjustmentMethod::OptEntropy {
                continue;
            }
            let e = Election::new(&sample_input(), &rules_with(m.token())).unwrap();
            let r = e.run(0, None).unwrap_or_else(|err| panic!("{m}: {err}"));
            assert_eq!(matrix::total(&r.total_alloc), 15, "{m}");
        }
    }

    #[test]
    fn one_const_merges_districts() {
        let rules = Rules::default().with_seat_spec(SeatSpecOption::OneConst).unwrap();
        let e = Election::new(&sample_input(), &rules).unwrap();
        assert_eq!(e.input().districts.len(), 1);
        assert_eq!(e.input().votes[0], vec![7500, 7400, 6000, 1000]);
        let r = e.run(0, None).unwrap();
        assert_eq!(matrix::total(&r.total_alloc), 15);
    }

    #[test]
    fn all_adj_has_no_constituency_seats() {
        let rules = Rules::default().with_seat_spec(SeatSpecOption::AllAdj).unwrap();
        let r = Election::new(&sample_input(), &rules).unwrap().run(0, None).unwrap();
        assert_eq!(matrix::total(&r.const_alloc), 0);
        assert_eq!(matrix::total(&r.adj_alloc), 15);
    }

    #[test]
    fn invalid_input_never_reaches_the_stages() {
        let mut input = sample_input();
        input.votes.pop();
        let err = Election::new(&input, &Rules::default()).unwrap_err();
        assert!(matches!(err, ElectionError::Validation(_)));
        assert!(!err.is_infeasible());
    }

    #[test]
    fn constituency_threshold_can_starve_a_district() {
        // nobody reaches half the vote in North
        let rules = Rules::default().with_setting("constituency_threshold", "50").unwrap();
        let err = Election::new(&sample_input(), &rules).unwrap().run(0, None).unwrap_err();
        assert!(matches!(err, ElectionError::Apportion { stage: Stage::PrimaryApportionment, .. }));
        assert!(err.is_infeasible());
        assert!(err.to_string().contains("North"));
    }
}
