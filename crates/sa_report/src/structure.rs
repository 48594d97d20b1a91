//! crates/sa_report/src/structure.rs
//! Report data model for one election result. Indices are resolved to names
//! here so renderers never look anything up.

use serde::Serialize;

use sa_core::matrix;
use sa_pipeline::ElectionResult;

#[derive(Clone, Debug, Serialize)]
pub struct ElectionReport {
    pub ruleset: RulesetLine,
    pub parties: Vec<String>,
    pub votes: Vec<VoteRow>,
    pub seats: SeatTable,
    pub awards: Vec<AwardLine>,
    pub violating: bool,
    pub entropy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,
    pub tie_breaks: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RulesetLine {
    pub name: String,
    pub method: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VoteRow {
    pub district: String,
    pub votes: Vec<u64>,
}

/// District rows plus a national total row.
#[derive(Clone, Debug, Serialize)]
pub struct SeatTable {
    pub rows: Vec<SeatRow>,
    pub total: SeatRow,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeatRow {
    pub district: String,
    pub constituency: Vec<u32>,
    pub adjustment: Vec<u32>,
    pub total: Vec<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AwardLine {
    pub seat: u32,
    pub district: String,
    pub party: String,
    pub reason: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_party: Option<String>,
}

pub fn build_election_report(r: &ElectionResult, input_digest: Option<&str>) -> ElectionReport {
    let cols = r.parties.len();
    let parties: Vec<String> = r.parties.iter().map(|p| p.to_string()).collect();
    let district = |d: usize| r.districts.get(d).map_or_else(|| format!("#{d}"), |x| x.name.to_string());
    let party = |p: usize| parties.get(p).cloned().unwrap_or_else(|| format!("#{p}"));

    let rows = (0..r.districts.len())
        .map(|d| SeatRow {
            district: district(d),
            constituency: r.const_alloc[d].clone(),
            adjustment: r.adj_alloc[d].clone(),
            total: r.total_alloc[d].clone(),
        })
        .collect();
    let total = SeatRow {
        district: "Total".into(),
        constituency: matrix::col_sums(&r.const_alloc, cols),
        adjustment: matrix::col_sums(&r.adj_alloc, cols),
        total: matrix::col_sums(&r.total_alloc, cols),
    };

    let awards = r
        .trail
        .iter()
        .map(|e| AwardLine {
            seat: e.seat,
            district: district(e.district),
            party: party(e.party),
            reason: e.reason.to_string(),
            score: e.score,
            from_party: e.from_party.map(party),
        })
        .collect();

    ElectionReport {
        ruleset: RulesetLine { name: r.ruleset.to_string(), method: r.method.to_string() },
        votes: r
            .votes
            .iter()
            .enumerate()
            .map(|(d, v)| VoteRow { district: district(d), votes: v.clone() })
            .collect(),
        parties,
        seats: SeatTable { rows, total },
        awards,
        violating: r.violating,
        entropy: r.entropy,
        input_digest: input_digest.map(str::to_owned),
        tie_breaks: r.tie_crumbs.len(),
    }
}
