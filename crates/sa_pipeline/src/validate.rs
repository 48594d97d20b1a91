//! crates/sa_pipeline/src/validate.rs
//! Structural & semantic validation before any computation.
//! Pure; issues are reported in a stable order (parties, districts, votes, rules).

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use sa_core::{Rules, SeatSpecOption};

use crate::election::ElectionInput;

/// Issue severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum EntityRef {
    Root,
    District(usize),
    Party(usize),
    Rule(&'static str),
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: EntityRef,
}

/// pass = no `Error`-severity issue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errs = self.errors();
        match errs.next() {
            None => f.write_str("ok"),
            Some(first) => {
                write!(f, "{}: {}", first.code, first.message)?;
                let rest = errs.count();
                if rest > 0 {
                    write!(f, " (+{rest} more)")?;
                }
                Ok(())
            }
        }
    }
}

fn err(code: &'static str, where_: EntityRef, message: String) -> ValidationIssue {
    ValidationIssue { severity: Severity::Error, code, message, where_ }
}

fn warn(code: &'static str, where_: EntityRef, message: String) -> ValidationIssue {
    ValidationIssue { severity: Severity::Warning, code, message, where_ }
}

/// Top-level entry point.
pub fn validate(input: &ElectionInput, rules: &Rules) -> ValidationReport {
    let mut issues = Vec::new();
    issues.extend(check_parties(input));
    issues.extend(check_districts(input));
    issues.extend(check_votes(input));
    issues.extend(check_rules(input, rules));
    let pass = !issues.iter().any(|i| i.severity == Severity::Error);
    ValidationReport { pass, issues }
}

fn check_parties(input: &ElectionInput) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    if input.parties.is_empty() {
        out.push(err("E_NO_PARTIES", EntityRef::Root, "at least one party is required".into()));
    }
    let mut seen = BTreeSet::new();
    for (i, p) in input.parties.iter().enumerate() {
        if !seen.insert(p.as_str()) {
            out.push(err("E_PARTY_DUP", EntityRef::Party(i), format!("duplicate party name {p:?}")));
        }
    }
    out
}

fn check_districts(input: &ElectionInput) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    if input.districts.is_empty() {
        out.push(err("E_NO_DISTRICTS", EntityRef::Root, "at least one district is required".into()));
    }
    let mut seen = BTreeSet::new();
    for (i, d) in input.districts.iter().enumerate() {
        if !seen.insert(d.name.as_str()) {
            out.push(err(
                "E_DISTRICT_DUP",
                EntityRef::District(i),
                format!("duplicate district name {:?}", d.name.as_str()),
            ));
        }
        if d.seats.total() == 0 {
            out.push(err(
                "E_DISTRICT_NO_SEATS",
                EntityRef::District(i),
                format!("district {:?} has no seats", d.name.as_str()),
            ));
        }
    }
    out
}

fn check_votes(input: &ElectionInput) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    if input.votes.len() != input.districts.len() {
        out.push(err(
            "E_VOTES_ROWS",
            EntityRef::Root,
            format!("{} vote rows for {} districts", input.votes.len(), input.districts.len()),
        ));
        return out;
    }
    let cols = input.parties.len();
    for (d, row) in input.votes.iter().enumerate() {
        if row.len() != cols {
            out.push(err(
                "E_VOTES_COLS",
                EntityRef::District(d),
                format!("{} vote entries for {cols} parties", row.len()),
            ));
            continue;
        }
        if row.iter().all(|&v| v == 0) {
            out.push(err("E_DISTRICT_NO_VOTES", EntityRef::District(d), "district has no votes".into()));
        }
    }
    if out.is_empty() {
        for p in 0..cols {
            if input.votes.iter().all(|r| r[p] == 0) {
                out.push(warn(
                    "W_PARTY_NO_VOTES",
                    EntityRef::Party(p),
                    format!("party {:?} has no votes anywhere", input.parties[p].as_str()),
                ));
            }
        }
    }
    out
}

fn check_rules(input: &ElectionInput, rules: &Rules) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    if rules.seat_spec_option() == SeatSpecOption::Custom
        && rules.custom_seats().len() != input.districts.len()
    {
        out.push(err(
            "E_CUSTOM_SEATS_LEN",
            EntityRef::Rule("custom_seats"),
            format!(
                "{} custom seat entries for {} districts",
                rules.custom_seats().len(),
                input.districts.len()
            ),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::tests::sample_input;

    #[test]
    fn sample_passes() {
        let r = validate(&sample_input(), &Rules::default());
        assert!(r.pass, "{r}");
    }

    #[test]
    fn shape_and_content_errors_are_named() {
        let mut input = sample_input();
        input.votes[1].pop();
        input.districts[0].seats.constituency_seats = 0;
        input.districts[0].seats.adjustment_seats = 0;
        let r = validate(&input, &Rules::default());
        assert!(!r.pass);
        let codes: Vec<_> = r.errors().map(|i| i.code).collect();
        assert_eq!(codes, vec!["E_DISTRICT_NO_SEATS", "E_VOTES_COLS"]);
        assert!(r.to_string().starts_with("E_DISTRICT_NO_SEATS"));
    }

    #[test]
    fn duplicates_and_empty_rows() {
        let mut input = sample_input();
        input.parties[1] = input.parties[0].clone();
        input.votes[0] = vec![0; input.parties.len()];
        let r = validate(&input, &Rules::default());
        let codes: Vec<_> = r.errors().map(|i| i.code).collect();
        assert_eq!(codes, vec!["E_PARTY_DUP", "E_DISTRICT_NO_VOTES"]);
    }
}
