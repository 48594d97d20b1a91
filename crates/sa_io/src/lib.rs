//! crates/sa_io/src/lib.rs
//! File-facing side of the engine.
//!
//! - `loader`: JSON election file → `ElectionFile` (input, rulesets, digest)
//! - `canonical_json`: sorted-key compact JSON and atomic writes
//! - `hasher`: SHA-256 over raw or canonical bytes

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod canonical_json;
pub mod hasher;
pub mod loader;

pub use loader::{load_election_file, parse_election_json, ElectionFile};

/// Unified error for sa_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors.
    #[error("io/path error: {0}")]
    Path(String),

    /// JSON parse or shape error; `at` is `line:column` when serde_json knows it.
    #[error("json error at {at}: {msg}")]
    Json { at: String, msg: String },

    /// Well-formed JSON that cannot become an election (bad ruleset, ...).
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        let at = if e.line() == 0 { "/".to_string() } else { format!("{}:{}", e.line(), e.column()) };
        IoError::Json { at, msg: e.to_string() }
    }
}
