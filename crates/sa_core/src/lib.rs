//! sa_core: Core types, rule domains and deterministic RNG.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`sa_algo`, `sa_pipeline`, `sa_io`, `sa_report`, `sa_cli`).
//!
//! - Names: `DistrictName`, `PartyName`, `RulesetName`
//! - Divisor sequences and quotas: `DivisorRule`, `DivisorCursor`, `QuotaRule`, `SeatRule`
//! - Ruleset configuration: `Rules` (validated once, immutable afterwards)
//! - Vote/allocation matrices and shape helpers
//! - Seedable RNG (ChaCha20) for ties and simulation streams

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidName(String),
        UnknownRule(String),
        DomainOutOfRange(&'static str),
        RaggedMatrix { row: usize, expected: usize, found: usize },
        EmptyChoiceSet,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidName(s) => write!(f, "invalid name: {s:?}"),
                CoreError::UnknownRule(s) => write!(f, "unknown divisor/quota rule: {s}"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
                CoreError::RaggedMatrix { row, expected, found } => write!(
                    f,
                    "row {row} has {found} entries, expected {expected}"
                ),
                CoreError::EmptyChoiceSet => write!(f, "empty choice set"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod divisors;
pub mod ids;
pub mod matrix;
pub mod rng;
pub mod rules;

pub use divisors::{DivisorCursor, DivisorRule, QuotaRule, SeatRule};
pub use errors::CoreError;
pub use ids::{DistrictName, PartyName, RulesetName};
pub use matrix::{AllocationMatrix, VoteMatrix};
pub use rng::{TieCrumb, TieRng};
pub use rules::{AdjustmentMethod, Pct, Rules, RulesError, RulesSpec, SeatSpec, SeatSpecOption};
