//! crates/sa_pipeline/src/simulate.rs
//! Monte-Carlo simulation: perturb the reference votes, run every ruleset on
//! every synthetic table, and keep streaming statistics per measure.
//!
//! Iteration `i` is a pure function of `(seed, i)` and the reference data, so
//! iterations run in parallel (rayon, one chunk at a time) and their
//! accumulators are folded back in iteration order. The cancel flag is checked
//! before each iteration; only the contiguous prefix of finished iterations is
//! merged.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sa_algo::{metrics, EntropyOptimizer};
use sa_core::{
    matrix, rng::stream_rng, AdjustmentMethod, PartyName, Rules, RulesetName, SeatSpecOption,
    VoteMatrix,
};

use crate::election::{Election, ElectionError, ElectionInput, ElectionResult};
use crate::generate::BetaGenerator;
use crate::stats::{MeasureAccumulator, Summary};
use crate::PipelineError;

/// Scalar measures, in report order.
pub const SCALAR_MEASURES: &[&str] = &[
    "entropy",
    "entropy_ratio",
    "dev_opt",
    "dev_law",
    "dev_ind_const",
    "dev_one_const",
    "dev_all_adj",
    "loosemore_hanby",
    "sainte_lague",
    "dhondt_min",
    "dhondt_sum",
];

/// Per-cell measures; each carries one extra row for the national totals.
pub const LIST_MEASURES: &[&str] = &["votes", "const_seats", "adj_seats", "total_seats", "seat_shares"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// 0 runs the reference votes once, unperturbed.
    pub simulation_count: u64,
    pub stability: f64,
    pub seed: u64,
    /// 0 = rayon's global pool.
    pub threads: usize,
    pub chunk_size: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { simulation_count: 100, stability: 100.0, seed: 0, threads: 0, chunk_size: 64 }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.stability.is_finite() && self.stability > 1.0) {
            return Err(PipelineError::Config(format!("stability must be > 1, got {}", self.stability)));
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::Config("chunk_size must be positive".into()));
        }
        Ok(())
    }

    fn iterations(&self) -> u64 {
        self.simulation_count.max(1)
    }
}

// ---------------------------- Accumulators ----------------------------

#[derive(Debug, Clone)]
struct RulesetAcc {
    scalars: Vec<MeasureAccumulator>,
    /// measure × row × party
    lists: Vec<Vec<Vec<MeasureAccumulator>>>,
    failures: u64,
}

impl RulesetAcc {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            scalars: vec![MeasureAccumulator::default(); SCALAR_MEASURES.len()],
            lists: vec![vec![vec![MeasureAccumulator::default(); cols]; rows + 1]; LIST_MEASURES.len()],
            failures: 0,
        }
    }

    fn observe(&mut self, m: &Measures) {
        for (acc, &x) in self.scalars.iter_mut().zip(&m.scalars) {
            acc.observe(x);
        }
        for (acc, table) in self.lists.iter_mut().zip(&m.lists) {
            for (acc_row, row) in acc.iter_mut().zip(table) {
                for (a, &x) in acc_row.iter_mut().zip(row) {
                    a.observe(x);
                }
            }
        }
    }

    fn merge(&mut self, other: &Self) {
        for (a, b) in self.scalars.iter_mut().zip(&other.scalars) {
            a.merge(b);
        }
        for (ta, tb) in self.lists.iter_mut().zip(&other.lists) {
            for (ra, rb) in ta.iter_mut().zip(tb) {
                for (a, b) in ra.iter_mut().zip(rb) {
                    a.merge(b);
                }
            }
        }
        self.failures += other.failures;
    }
}

struct Measures {
    scalars: Vec<f64>,
    lists: Vec<Vec<Vec<f64>>>,
}

// ---------------------------- Report ----------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RulesetReport {
    pub name: RulesetName,
    pub method: AdjustmentMethod,
    /// District names of the effective layout, then `"Total"`.
    pub rows: Vec<String>,
    pub failures: u64,
    pub measures: BTreeMap<&'static str, Summary>,
    pub lists: BTreeMap<&'static str, Vec<Vec<Summary>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: SimulationConfig,
    /// Iterations merged into the statistics.
    pub completed: u64,
    pub cancelled: bool,
    pub parties: Vec<PartyName>,
    pub rulesets: Vec<RulesetReport>,
}

// ---------------------------- Comparison runs ----------------------------

/// A ruleset plus the variants its deviation measures compare against.
#[derive(Debug, Clone)]
struct Plan {
    main: Rules,
    opt: Rules,
    law: Rules,
    all_const: Rules,
    one_const: Rules,
    all_adj: Rules,
    rows: Vec<String>,
}

impl Plan {
    fn new(rules: &Rules, input: &ElectionInput) -> Result<Self, ElectionError> {
        let layout = Election::new(input, rules)?;
        let mut rows: Vec<String> =
            layout.input().districts.iter().map(|d| d.name.to_string()).collect();
        rows.push("Total".into());
        Ok(Self {
            main: rules.clone(),
            opt: rules.with_method(AdjustmentMethod::AlternatingScaling),
            law: rules.with_method(AdjustmentMethod::IcelandicLaw),
            all_const: rules.with_seat_spec(SeatSpecOption::AllConst)?,
            one_const: rules.with_seat_spec(SeatSpecOption::OneConst)?,
            all_adj: rules.with_seat_spec(SeatSpecOption::AllAdj)?,
            rows,
        })
    }
}

fn run_once(
    input: &ElectionInput,
    rules: &Rules,
    stream: u64,
    optimizer: Option<&dyn EntropyOptimizer>,
) -> Result<ElectionResult, ElectionError> {
    Election::new(input, rules)?.run(stream, optimizer)
}

/// Cell deviation when the layouts agree, party-total deviation otherwise
/// (one merged district against many).
fn layout_deviation(a: &ElectionResult, b: &ElectionResult) -> f64 {
    if a.total_alloc.len() == b.total_alloc.len() {
        metrics::deviation(&a.total_alloc, &b.total_alloc)
    } else {
        metrics::deviation_1d(&a.party_totals(), &b.party_totals())
    }
}

fn measure(
    plan: &Plan,
    input: &ElectionInput,
    stream: u64,
    optimizer: Option<&dyn EntropyOptimizer>,
) -> Result<Measures, ElectionError> {
    let main = run_once(input, &plan.main, stream, optimizer)?;
    let opt = run_once(input, &plan.opt, stream, optimizer)?;
    let law = run_once(input, &plan.law, stream, optimizer)?;
    let all_const = run_once(input, &plan.all_const, stream, optimizer)?;
    let one_const = run_once(input, &plan.one_const, stream, optimizer)?;
    let all_adj = run_once(input, &plan.all_adj, stream, optimizer)?;

    let votes = main.party_votes();
    let seats = main.party_totals();
    let scalars = vec![
        main.entropy,
        (main.entropy - opt.entropy).exp(),
        layout_deviation(&main, &opt),
        layout_deviation(&main, &law),
        layout_deviation(&main, &all_const),
        metrics::deviation_1d(&seats, &one_const.party_totals()),
        layout_deviation(&main, &all_adj),
        metrics::loosemore_hanby(&votes, &seats),
        metrics::sainte_lague(&votes, &seats),
        metrics::dhondt_min(&votes, &seats),
        metrics::dhondt_sum(&votes, &seats),
    ];
    Ok(Measures { scalars, lists: list_measures(&main) })
}

fn with_total_row<T: Copy>(rows: &[Vec<T>], total: Vec<T>, conv: impl Fn(T) -> f64) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|r| r.iter().map(|&x| conv(x)).collect())
        .chain(std::iter::once(total.into_iter().map(&conv).collect()))
        .collect()
}

fn list_measures(r: &ElectionResult) -> Vec<Vec<Vec<f64>>> {
    let cols = r.parties.len();
    let seats = |m: &[Vec<u32>]| with_total_row(m, matrix::col_sums(m, cols), f64::from);
    let vote_rows: Vec<Vec<f64>> = matrix::to_f64(&r.votes);
    let votes = with_total_row(&vote_rows, matrix::vote_col_totals(&vote_rows, cols), |x| x);
    let total = seats(&r.total_alloc);
    let shares: Vec<Vec<f64>> = total
        .iter()
        .map(|row| {
            let sum: f64 = row.iter().sum();
            row.iter().map(|&x| if sum > 0.0 { x / sum } else { 0.0 }).collect()
        })
        .collect();
    vec![votes, seats(&r.const_alloc), seats(&r.adj_alloc), total, shares]
}

// ---------------------------- Driver ----------------------------

/// Run a simulation. `cancel` may be raised from another thread at any time.
pub fn simulate(
    input: &ElectionInput,
    rulesets: &[Rules],
    config: &SimulationConfig,
    optimizer: Option<&dyn EntropyOptimizer>,
    cancel: &AtomicBool,
) -> Result<SimulationReport, PipelineError> {
    config.validate()?;
    let generator = BetaGenerator::new(input.votes.clone(), config.stability)?;
    let plans: Vec<Plan> =
        rulesets.iter().map(|r| Plan::new(r, input)).collect::<Result<_, _>>()?;

    let run = || drive(input, &plans, &generator, config, optimizer, cancel);
    let (accs, completed) = if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| PipelineError::Threads(e.to_string()))?
            .install(run)
    } else {
        run()
    };

    let cancelled = completed < config.iterations();
    if cancelled {
        warn!(completed, requested = config.iterations(), "simulation stopped early");
    }
    info!(completed, rulesets = plans.len(), "simulation finished");

    let rulesets = plans
        .iter()
        .zip(accs)
        .map(|(plan, acc)| report(plan, &acc))
        .collect();
    Ok(SimulationReport {
        config: config.clone(),
        completed,
        cancelled,
        parties: input.parties.clone(),
        rulesets,
    })
}

fn drive(
    input: &ElectionInput,
    plans: &[Plan],
    generator: &BetaGenerator,
    config: &SimulationConfig,
    optimizer: Option<&dyn EntropyOptimizer>,
    cancel: &AtomicBool,
) -> (Vec<RulesetAcc>, u64) {
    let cols = input.parties.len();
    let fresh = || -> Vec<RulesetAcc> {
        plans.iter().map(|p| RulesetAcc::new(p.rows.len() - 1, cols)).collect()
    };
    let mut accs = fresh();
    let mut completed = 0u64;
    let total = config.iterations();
    let chunk = config.chunk_size as u64;

    let mut start = 0u64;
    while start < total {
        let end = (start + chunk).min(total);
        let outcomes: Vec<Option<Vec<RulesetAcc>>> = (start..end)
            .into_par_iter()
            .map(|i| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(iteration(i, input, plans, generator, config, optimizer, fresh()))
            })
            .collect();
        for outcome in outcomes {
            let Some(part) = outcome else {
                return (accs, completed);
            };
            for (a, b) in accs.iter_mut().zip(&part) {
                a.merge(b);
            }
            completed += 1;
        }
        debug!(completed, total, "chunk folded");
        start = end;
    }
    (accs, completed)
}

fn iteration(
    i: u64,
    input: &ElectionInput,
    plans: &[Plan],
    generator: &BetaGenerator,
    config: &SimulationConfig,
    optimizer: Option<&dyn EntropyOptimizer>,
    mut accs: Vec<RulesetAcc>,
) -> Vec<RulesetAcc> {
    let votes: Result<VoteMatrix, PipelineError> = if config.simulation_count == 0 {
        Ok(generator.reference().clone())
    } else {
        generator.draw(&mut stream_rng(config.seed, i))
    };
    let votes = match votes {
        Ok(v) => v,
        Err(e) => {
            warn!(iteration = i, error = %e, "vote generation failed");
            accs.iter_mut().for_each(|a| a.failures += 1);
            return accs;
        }
    };
    let table = input.with_votes(votes);
    for (plan, acc) in plans.iter().zip(accs.iter_mut()) {
        match measure(plan, &table, i, optimizer) {
            Ok(m) => acc.observe(&m),
            Err(e) => {
                warn!(iteration = i, ruleset = %plan.main.name(), error = %e, "iteration dropped");
                acc.failures += 1;
            }
        }
    }
    accs
}

fn report(plan: &Plan, acc: &RulesetAcc) -> RulesetReport {
    let measures = SCALAR_MEASURES
        .iter()
        .zip(&acc.scalars)
        .map(|(&k, a)| (k, a.summary()))
        .collect();
    let lists = LIST_MEASURES
        .iter()
        .zip(&acc.lists)
        .map(|(&k, table)| {
            let rows = table.iter().map(|row| row.iter().map(|a| a.summary()).collect()).collect();
            (k, rows)
        })
        .collect();
    RulesetReport {
        name: plan.main.name().clone(),
        method: plan.main.adjustment_method(),
        rows: plan.rows.clone(),
        failures: acc.failures,
        measures,
        lists,
    }
}
