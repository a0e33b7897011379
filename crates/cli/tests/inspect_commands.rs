use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const RECORDS: &str = r#"[
    {"key": "a", "shard_key": 0},
    {"key": "b", "shard_key": 4, "fields": {"age": 15}},
    {"key": "c", "shard_key": 2},
    {"key": "d", "shard_key": 3}
]"#;

fn run(dir: &Path, args: &[&str]) -> (bool, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_shardcache"))
        .arg("--config")
        .arg(dir.join("missing-config.json"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run shardcache");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = serde_json::from_str(&stdout).unwrap_or(Value::Null);
    (output.status.success(), value)
}

fn records_file(dir: &TempDir) -> String {
    let path = dir.path().join("records.json");
    fs::write(&path, RECORDS).unwrap();
    path.display().to_string()
}

#[test]
fn test_layout_groups_keys_by_shard() {
    let dir = TempDir::new().unwrap();
    let records = records_file(&dir);

    let (ok, layout) = run(dir.path(), &["layout", &records]);
    assert!(ok);

    let shards = layout.as_array().unwrap();
    let indices: Vec<i64> = shards.iter().map(|s| s["index"].as_i64().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(shards[0]["keys"], serde_json::json!(["a", "d"]));
    assert_eq!(shards[1]["keys"], serde_json::json!(["b"]));
    assert_eq!(shards[2]["keys"], serde_json::json!(["c"]));
}

#[test]
fn test_get_prints_record() {
    let dir = TempDir::new().unwrap();
    let records = records_file(&dir);

    let (ok, record) = run(dir.path(), &["get", &records, "b", "--shard-key", "4"]);
    assert!(ok);
    assert_eq!(record["fields"]["age"], 15);
}

#[test]
fn test_get_on_wrong_shard_fails() {
    let dir = TempDir::new().unwrap();
    let records = records_file(&dir);

    let (ok, _) = run(dir.path(), &["get", &records, "b", "--shard-key", "0"]);
    assert!(!ok);
}

#[test]
fn test_set_moves_record() {
    let dir = TempDir::new().unwrap();
    let records = records_file(&dir);

    let (ok, report) = run(
        dir.path(),
        &["set", &records, "a", "--shard-key", "0", "--move-to", "5"],
    );
    assert!(ok);
    assert_eq!(report["affected"], true);
    assert_eq!(report["shard"], 2);
    assert_eq!(report["mirrored"], true);
}

#[test]
fn test_config_reports_defaults() {
    let dir = TempDir::new().unwrap();

    let (ok, loaded) = run(dir.path(), &["config"]);
    assert!(ok);
    assert_eq!(loaded["config"]["name"], "shardcache");
    assert_eq!(loaded["source"], "Default");
}
