// crates/sa_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Algorithm layer: everything that turns votes and seat targets into seats.
//! Pure and synchronous; randomness only through the `TieRng` a caller passes in.

// ----------------------------- 1-D apportionment -----------------------------

pub mod apportion;
pub mod sequence;
pub mod threshold;

pub use apportion::{apportion1d, ApportionError, Apportionment};
pub use sequence::{apportion1d_general, AwardSequence, AwardStep, GeneralApportionment};

// ----------------------------- Adjustment seats ------------------------------

pub mod adjustment;
pub mod feasibility;

pub use adjustment::{
    adjust, AdjustContext, AdjustError, AdjustmentInput, AdjustmentOutcome, AuditTrail,
    AwardEvent, AwardReason, EntropyOptimizer, EntropyProblem,
};

// ----------------------------- Measures --------------------------------------

pub mod metrics;
