//! CLI integration tests for fieldpulsectl
//!
//! Drives the built binary against a temporary dataset, config and visit database:
//! - fieldpulsectl config       effective TOML
//! - fieldpulsectl report       pooled node rollups (text and JSON)
//! - fieldpulsectl assignment   per-assignment visit metrics
//! - fieldpulsectl sales        Recruitment Rhythm with ramp
//! - fieldpulsectl attention    quiet assignments under a node
//! - fieldpulsectl record       visit recording and its rejections (exit 2)

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const DATASET: &str = r#"{
    "doctors": [{"id": 1, "name": "Dr. Haddad"}, {"id": 2, "name": "Dr. Idrissi"}],
    "products": [{"id": 7, "name": "Cardiolex"}],
    "delegates": [
        {"id": 10, "name": "North", "role": "supervisor"},
        {"id": 100, "name": "Karim", "supervisor_id": 10},
        {"id": 101, "name": "Layla", "supervisor_id": 10}
    ],
    "visit_assignments": [
        {"id": 1, "delegate_id": 100, "doctor_id": 1, "monthly_frequency": 2},
        {"id": 2, "delegate_id": 101, "doctor_id": 2, "monthly_frequency": 1}
    ],
    "visit_events": [
        {"id": 1, "assignment_id": 1, "date": "2024-01-08"},
        {"id": 2, "assignment_id": 1, "date": "2024-01-22"},
        {"id": 3, "assignment_id": 1, "date": "2024-02-12"}
    ],
    "sales_assignments": [
        {"id": 1, "delegate_id": 100, "product_id": 7, "year": 2024,
         "monthly_target": [100,100,100,100,100,100,100,100,100,100,100,100],
         "monthly_achieved": [100,100,50,0,0,0,0,0,0,0,0,0]}
    ]
}"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dataset.json"), DATASET).unwrap();
        std::fs::write(dir.path().join("config.toml"), "[logging]\nlevel = \"error\"\n").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn data(&self) -> String {
        self.path("dataset.json").display().to_string()
    }

    fn run(&self, args: &[&str]) -> Output {
        run_with(&self.path("config.toml"), &self.path("visits.db"), args)
    }
}

fn run_with(config: &Path, db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fieldpulsectl"))
        .env_remove("FIELDPULSE_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .arg("--db")
        .arg(db)
        .args(["--today", "2024-03-11"])
        .args(args)
        .output()
        .expect("Failed to run fieldpulsectl")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn test_config_prints_effective_toml() {
    let fx = Fixture::new();
    let output = fx.run(&["config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[metrics]"));
    assert!(stdout.contains("elapsed_months = \"include_current\""));
    assert!(stdout.contains("level = \"error\""));
}

#[test]
fn test_missing_explicit_config_exits_one() {
    let fx = Fixture::new();
    let output = run_with(&fx.path("absent.toml"), &fx.path("visits.db"), &["config"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_report_node_json() {
    let fx = Fixture::new();
    let rollup = stdout_json(&fx.run(&["--json", "report", "--data", fx.data().as_str(), "--node", "10"]));

    assert_eq!(rollup["node_id"], 10);
    assert_eq!(rollup["nodes"], 3);
    assert_eq!(rollup["visits"]["ytd_visits"], 3);
    assert_eq!(rollup["visits"]["expected_visits"], 9);
    assert_eq!(rollup["visits"]["return_index"], 33);
    assert_eq!(rollup["sales"]["achievement_rate"], 83);
    assert_eq!(rollup["members"].as_array().unwrap().len(), 2);
}

#[test]
fn test_report_roots_text() {
    let fx = Fixture::new();
    let output = fx.run(&["report", "--data", fx.data().as_str()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[NODE]"));
    assert!(stdout.contains("[VISITS]"));
    assert!(stdout.contains("[BY PRODUCT]"));
    assert!(stdout.contains("Cardiolex"));
    assert!(stdout.contains("Karim"));
}

#[test]
fn test_assignment_metrics() {
    let fx = Fixture::new();
    let value = stdout_json(&fx.run(&["--json", "assignment", "--data", fx.data().as_str(), "--id", "1"]));
    assert_eq!(value["activity"]["monthly_visit_counts"], serde_json::json!([2, 1, 0]));
    assert_eq!(value["activity"]["return_index"], 50);
    assert_eq!(value["activity"]["can_record_today"], true);
}

#[test]
fn test_sales_rhythm_with_ramp() {
    let fx = Fixture::new();
    let value = stdout_json(&fx.run(&["--json", "sales", "--data", fx.data().as_str(), "--id", "1"]));
    assert_eq!(value["rhythm"]["gap"], 950);
    assert_eq!(value["rhythm"]["triangular_denominator"], 45);
    assert_eq!(value["rhythm"]["recruitment_rhythm"], 22);

    let ramp = value["ramp"].as_array().unwrap();
    assert_eq!(ramp.len(), 9);
    assert_eq!(ramp[0]["month"], 4);
    assert_eq!(ramp[8]["amount"], 198);
}

#[test]
fn test_attention_lists_quiet_assignment() {
    let fx = Fixture::new();
    let output = fx.run(&["attention", "--data", fx.data().as_str(), "--node", "10"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 assignment(s)"));
    assert!(stdout.contains("Dr. Idrissi"));
    assert!(!stdout.contains("Dr. Haddad"));
}

#[test]
fn test_record_then_duplicate_exits_two() {
    let fx = Fixture::new();
    let data = fx.data();
    let args: [&str; 7] = ["record", "--data", data.as_str(), "--assignment", "1", "--delegate", "100"];

    let mut with_json = vec!["--json"];
    with_json.extend_from_slice(&args);
    let first = stdout_json(&fx.run(&with_json));
    assert_eq!(first["event"]["date"], "2024-03-11");
    assert_eq!(first["activity"]["ytd_visits"], 4);

    let second = fx.run(&args);
    assert_eq!(second.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&second.stderr).contains("duplicate_visit"));
}

#[test]
fn test_record_for_someone_else_exits_two() {
    let fx = Fixture::new();
    let output = fx.run(&["record", "--data", fx.data().as_str(), "--assignment", "2", "--delegate", "100"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not_found"));
}

#[test]
fn test_record_future_date_exits_two() {
    let fx = Fixture::new();
    let output = fx.run(&[
        "record", "--data", fx.data().as_str(), "--assignment", "1", "--delegate", "100", "--date", "2024-03-12",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid_input"));
}

#[test]
fn test_missing_dataset_exits_one() {
    let fx = Fixture::new();
    let missing = fx.path("missing.json").display().to_string();
    let output = fx.run(&["report", "--data", missing.as_str()]);
    assert_eq!(output.status.code(), Some(1));
}
