//! CLI integration tests
//!
//! Drive the built `vellum` binary against a scratch database and check
//! the JSON it prints.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_config(temp_dir: &TempDir) -> PathBuf {
    let db_path = temp_dir.path().join("data").join("vellum.db");
    let config_path = temp_dir.path().join("vellum.toml");
    let config = format!(
        r#"
[database]
path = "{}"
busy_timeout_ms = 200

[logging]
profile = "test"

[[entity]]
name = "reference"
primary_key = "curie"
unversioned = ["authors"]
columns = [
  {{ name = "title", type = "text", nullable = false }},
  {{ name = "page_count", type = "integer" }},
]
"#,
        db_path.display().to_string().replace('\\', "/")
    );
    fs::write(&config_path, config).unwrap();
    config_path
}

fn vellum(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vellum"))
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn json_ok(config: &Path, args: &[&str]) -> serde_json::Value {
    let output = vellum(config, args);
    assert!(
        output.status.success(),
        "vellum {:?} failed. Stderr: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_init_reports_tables() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let out = json_ok(&config, &["init"]);
    assert_eq!(out["entity_types"][0]["version_table"], "reference_version");
    assert_eq!(out["migrations"][0]["migration_id"], "001_transaction_ledger");
    assert!(temp_dir.path().join("data").join("vellum.db").exists());
}

#[test]
fn test_cli_create_update_history_revert() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let created = json_ok(
        &config,
        &[
            "entity",
            "create",
            "--type",
            "reference",
            "--json",
            r#"{"curie": "R1", "title": "Bob", "authors": ["A1"]}"#,
            "--actor",
            "curator",
        ],
    );
    assert_eq!(created["entity_id"], "R1");
    assert_eq!(created["row"]["operation"], "insert");
    let first_tx = created["transaction"]["id"].as_i64().unwrap();

    json_ok(
        &config,
        &[
            "entity",
            "update",
            "--type",
            "reference",
            "--id",
            "R1",
            "--json",
            r#"{"title": "new title"}"#,
        ],
    );

    let history = json_ok(&config, &["history", "--type", "reference", "--id", "R1"]);
    let sets = history.as_array().unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0]["changeset"]["title"]["old"], serde_json::Value::Null);
    assert_eq!(sets[0]["changeset"]["title"]["new"], "Bob");
    assert_eq!(sets[1]["changeset"]["title"]["old"], "Bob");
    assert_eq!(sets[1]["changeset"]["title"]["new"], "new title");

    let markdown = vellum(
        &config,
        &["history", "--type", "reference", "--id", "R1", "--markdown"],
    );
    assert!(markdown.status.success());
    let text = String::from_utf8_lossy(&markdown.stdout);
    assert!(text.contains("## History of reference `R1`"));
    assert!(text.contains("by curator"));

    let reverted = json_ok(
        &config,
        &[
            "revert",
            "--type",
            "reference",
            "--id",
            "R1",
            "--to",
            &first_tx.to_string(),
        ],
    );
    assert_eq!(reverted["row"]["columns"]["title"], "Bob");
    assert!(reverted["transaction"]["id"].as_i64().unwrap() > first_tx + 1);

    let as_of = json_ok(
        &config,
        &["as-of", "--type", "reference", "--id", "R1", "--tx", &first_tx.to_string()],
    );
    assert_eq!(as_of["columns"]["title"], "Bob");

    let reports = json_ok(&config, &["verify", "--type", "reference"]);
    assert_eq!(reports.as_array().unwrap().len(), 0);

    let listed = json_ok(&config, &["transaction", "list", "--limit", "10"]);
    assert_eq!(listed.as_array().unwrap().len(), 3);

    let shown = json_ok(&config, &["transaction", "show", "--id", &first_tx.to_string()]);
    assert_eq!(shown["changes"][0]["entity_id"], "R1");
    assert_eq!(shown["changes"][0]["operation"], "insert");
}

#[test]
fn test_cli_reports_errors_on_stderr() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    let output = vellum(&config, &["history", "--type", "reference", "--id", "missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_NOT_FOUND"), "stderr: {}", stderr);

    let output = vellum(
        &config,
        &["entity", "create", "--type", "reference", "--json", r#"{"curie": "R1", "colour": "red"}"#],
    );
    assert!(!output.status.success());
}

#[test]
fn test_cli_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = vellum(&temp_dir.path().join("absent.toml"), &["init"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration error"));
}
