//! sa_pipeline: orchestration on top of `sa_algo`.
//!
//! - `validate`: structural checks on an election input, before anything runs
//! - `election`: the stage machine (primary → threshold → seat count → adjustment)
//! - `generate`, `stats`, `simulate`: Monte-Carlo runs with streaming statistics
//!
//! I/O-free; loading and rendering live in `sa_io` and `sa_report`.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod election;
pub mod generate;
pub mod simulate;
pub mod stats;
pub mod validate;

pub use election::{
    AdjustmentSeatCount, District, Election, ElectionError, ElectionInput, ElectionResult,
    PrimaryApportionment, Stage, ThresholdElimination,
};
pub use generate::BetaGenerator;
pub use simulate::{
    simulate, RulesetReport, SimulationConfig, SimulationReport, LIST_MEASURES, SCALAR_MEASURES,
};
pub use stats::{MeasureAccumulator, Summary};
pub use validate::{validate, EntityRef, Severity, ValidationIssue, ValidationReport};

/// Single error surface for the simulation driver.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Election(#[from] ElectionError),

    #[error("vote generation: {0}")]
    Generate(String),

    #[error("thread pool: {0}")]
    Threads(String),
}
