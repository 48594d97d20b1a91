//! End-to-end runs of the `sa` binary against the election fixtures:
//! output shape per subcommand and the exit code for each failure bucket.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

// -----------------------------------------------------------------------------
// Fixture paths
// -----------------------------------------------------------------------------
const THREE_DISTRICTS: &str = "three_districts.json";
const INFEASIBLE: &str = "infeasible.json";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/elections").join(name)
}

fn sa() -> Command {
    let mut cmd = Command::cargo_bin("sa").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

// -----------------------------------------------------------------------------
// validate
// -----------------------------------------------------------------------------
#[test]
fn validate_reports_counts_and_digest() {
    sa().args(["validate", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ok: 4 parties, 3 districts, 3 ruleset(s), sha256 "));
}

#[test]
fn malformed_json_is_a_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ \"parties\": [\"A\", ").unwrap();
    sa().args(["validate", "--input"]).arg(&path).assert().code(2);
}

#[test]
fn unknown_rules_key_is_a_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_rules.json");
    std::fs::write(
        &path,
        r#"{ "parties": ["A"],
             "districts": [{ "name": "X", "constituency_seats": 1, "adjustment_seats": 0, "votes": [10] }],
             "rules": [{ "name": "r", "adjustment_metod": "monge" }] }"#,
    )
    .unwrap();
    sa().args(["validate", "--input"]).arg(&path).assert().code(2);
}

#[test]
fn missing_input_is_an_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    sa().args(["validate", "--input"])
        .arg(dir.path().join("nope.json"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn urls_are_refused() {
    sa().args(["validate", "--input", "https://example.org/election.json"]).assert().code(2);
}

// -----------------------------------------------------------------------------
// apportion
// -----------------------------------------------------------------------------
#[test]
fn apportion_text_covers_every_ruleset() {
    sa().args(["apportion", "--quiet", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Ruleset: law (icelandic-law)")
                .and(predicate::str::contains("Ruleset: scaling (alternating-scaling)"))
                .and(predicate::str::contains("Ruleset: lund (switching)"))
                .and(predicate::str::contains("Total seats")),
        );
}

#[test]
fn apportion_json_for_one_ruleset() {
    let out = sa()
        .args(["apportion", "--quiet", "--ruleset", "law", "--format", "json", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let reports = v.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["ruleset"]["name"], "law");
    let total: u64 = reports[0]["seats"]["total"]["total"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n.as_u64().unwrap())
        .sum();
    assert_eq!(total, 15);
    assert_eq!(reports[0]["seats"]["total"]["total"][3], 0);
}

#[test]
fn apportion_writes_one_file_per_ruleset() {
    let dir = tempfile::tempdir().unwrap();
    sa().args(["apportion", "--quiet", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .arg("--out")
        .arg(dir.path())
        .assert()
        .success();
    for name in ["law", "scaling", "lund"] {
        let bytes = std::fs::read(dir.path().join(format!("{name}.json"))).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["ruleset"], name);
    }
}

#[test]
fn settings_override_the_ruleset() {
    sa().args(["apportion", "--quiet", "--ruleset", "law", "--set", "adjustment_method=monge", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .assert()
        .success()
        .stdout(predicate::str::contains("Ruleset: law (monge)"));

    sa().args(["apportion", "--quiet", "--set", "no_such_key=1", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .assert()
        .code(2);
}

#[test]
fn unknown_ruleset_is_a_validation_failure() {
    sa().args(["apportion", "--ruleset", "missing", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown ruleset"));
}

#[test]
fn district_without_survivors_is_infeasible() {
    sa().args(["validate", "--input"]).arg(fixture(INFEASIBLE)).assert().success();
    sa().args(["apportion", "--input"])
        .arg(fixture(INFEASIBLE))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("West"));
}

// -----------------------------------------------------------------------------
// simulate
// -----------------------------------------------------------------------------
#[test]
fn simulate_json_overrides_file_settings() {
    let out = sa()
        .args(["simulate", "--quiet", "--count", "3", "--threads", "1", "--format", "json", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["completed"], 3);
    assert_eq!(v["cancelled"], false);
    assert_eq!(v["config"]["seed"], 5);
    assert_eq!(v["config"]["stability"], 120.0);
    assert_eq!(v["rulesets"].as_array().unwrap().len(), 3);
}

#[test]
fn simulate_text_and_report_file() {
    let dir = tempfile::tempdir().unwrap();
    sa().args(["simulate", "--quiet", "--count", "2", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .arg("--out")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Simulation: 2 of 2 iterations"));
    let bytes = std::fs::read(dir.path().join("simulation.json")).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["completed"], 2);
}

#[test]
fn bad_stability_is_a_validation_failure() {
    sa().args(["simulate", "--stability", "0.5", "--input"])
        .arg(fixture(THREE_DISTRICTS))
        .assert()
        .code(2);
}
