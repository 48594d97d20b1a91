//! Loader: read a local JSON election file and return a typed `ElectionFile`.
//!
//! ```json
//! { "parties": ["A", "B"],
//!   "districts": [{ "name": "North", "constituency_seats": 5,
//!                   "adjustment_seats": 1, "votes": [1200, 800] }],
//!   "rules": [{ "name": "law", "adjustment_method": "icelandic-law" }],
//!   "simulation": { "simulation_count": 200, "stability": 100.0 } }
//! ```
//!
//! `rules` and `simulation` are optional; an empty `rules` list means one
//! default ruleset. Shape checks beyond JSON typing (row lengths, empty
//! districts, ...) are left to `sa_pipeline::validate`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use sa_core::{DistrictName, PartyName, Rules, SeatSpec};
use sa_pipeline::{District, ElectionInput, SimulationConfig};

use crate::{hasher, IoError, IoResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireDistrict {
    name: DistrictName,
    constituency_seats: u32,
    adjustment_seats: u32,
    votes: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireFile {
    parties: Vec<PartyName>,
    districts: Vec<WireDistrict>,
    #[serde(default)]
    rules: Vec<Rules>,
    #[serde(default)]
    simulation: Option<SimulationConfig>,
}

/// Loaded election file.
#[derive(Debug, Clone)]
pub struct ElectionFile {
    pub input: ElectionInput,
    /// Never empty.
    pub rulesets: Vec<Rules>,
    pub simulation: Option<SimulationConfig>,
    /// SHA-256 of the file's canonical JSON bytes.
    pub digest: String,
}

impl ElectionFile {
    pub fn ruleset(&self, name: &str) -> Option<&Rules> {
        self.rulesets.iter().find(|r| r.name().as_str() == name)
    }
}

pub fn load_election_file(path: &Path) -> IoResult<ElectionFile> {
    let text = fs::read_to_string(path)
        .map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    parse_election_json(&text)
}

pub fn parse_election_json(text: &str) -> IoResult<ElectionFile> {
    let value: Value = serde_json::from_str(text)?;
    let digest = hasher::sha256_canonical(&value)?;
    let wire: WireFile = serde_json::from_value(value)?;

    let mut rulesets = wire.rules;
    if rulesets.is_empty() {
        rulesets.push(Rules::default());
    }
    let mut seen = BTreeSet::new();
    for r in &rulesets {
        if !seen.insert(r.name().as_str()) {
            return Err(IoError::Invalid(format!("duplicate ruleset name {:?}", r.name().as_str())));
        }
    }

    let (districts, votes) = wire
        .districts
        .into_iter()
        .map(|d| {
            let seats = SeatSpec {
                constituency_seats: d.constituency_seats,
                adjustment_seats: d.adjustment_seats,
            };
            (District { name: d.name, seats }, d.votes)
        })
        .unzip();

    Ok(ElectionFile {
        input: ElectionInput { parties: wire.parties, districts, votes },
        rulesets,
        simulation: wire.simulation,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_core::AdjustmentMethod;

    const FILE: &str = r#"{
        "parties": ["A", "B"],
        "districts": [
            { "name": "North", "constituency_seats": 2, "adjustment_seats": 1, "votes": [300, 100] },
            { "name": "South", "constituency_seats": 1, "adjustment_seats": 1, "votes": [50, 250] }
        ],
        "rules": [
            { "name": "law" },
            { "name": "nn", "adjustment_method": "nearest-neighbor", "adjustment_threshold": 0 }
        ]
    }"#;

    #[test]
    fn parses_districts_votes_and_rules() {
        let f = parse_election_json(FILE).unwrap();
        assert_eq!(f.input.districts.len(), 2);
        assert_eq!(f.input.districts[1].seats.total(), 2);
        assert_eq!(f.input.votes, vec![vec![300, 100], vec![50, 250]]);
        assert_eq!(f.rulesets.len(), 2);
        assert_eq!(
            f.ruleset("nn").map(|r| r.adjustment_method()),
            Some(AdjustmentMethod::NearestNeighbor)
        );
        assert!(f.simulation.is_none());
    }

    #[test]
    fn digest_ignores_formatting_and_key_order() {
        let a = parse_election_json(FILE).unwrap();
        let reordered: Value = serde_json::from_str(FILE).unwrap();
        let b = parse_election_json(&serde_json::to_string_pretty(&reordered).unwrap()).unwrap();
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn missing_rules_means_default_ruleset() {
        let f = parse_election_json(
            r#"{"parties":["A"],"districts":[{"name":"X","constituency_seats":1,"adjustment_seats":0,"votes":[1]}]}"#,
        )
        .unwrap();
        assert_eq!(f.rulesets.len(), 1);
        assert_eq!(f.rulesets[0].name().as_str(), "default");
    }

    #[test]
    fn rejects_bad_shapes() {
        // negative votes
        let neg = FILE.replace("[300, 100]", "[-300, 100]");
        assert!(matches!(parse_election_json(&neg), Err(IoError::Json { .. })));
        // unknown rule key
        let unknown = FILE.replace(r#""name": "law""#, r#""name": "law", "colour": "red""#);
        assert!(matches!(parse_election_json(&unknown), Err(IoError::Json { .. })));
        // duplicate ruleset names
        let dup = FILE.replace(r#""name": "nn""#, r#""name": "law""#);
        assert!(matches!(parse_election_json(&dup), Err(IoError::Invalid(_))));
        // threshold outside 0..=100
        let pct = FILE.replace(r#""adjustment_threshold": 0"#, r#""adjustment_threshold": 140"#);
        assert!(parse_election_json(&pct).is_err());
    }
}
