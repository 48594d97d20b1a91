//! sa_report: report model + renderers (JSON, plain text).
//!
//! - No I/O here; callers pass results already in memory.
//! - Stable section order and field names.
//! - Numbers are formatted here and nowhere else.

#![forbid(unsafe_code)]

use core::fmt;

pub mod render_json;
pub mod render_text;
pub mod structure;

pub use render_json::render_json;
pub use render_text::{render_election_text, render_simulation_text};
pub use structure::{
    build_election_report, AwardLine, ElectionReport, RulesetLine, SeatRow, SeatTable,
};

#[derive(Debug)]
pub enum ReportError {
    Serialize(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Serialize(m) => write!(f, "report serialization failed: {m}"),
        }
    }
}

impl std::error::Error for ReportError {}

