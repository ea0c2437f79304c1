use assert_cmd::Command;
use predicates::prelude::*;

fn repo_config(name: &str) -> String {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join(name)
        .to_string_lossy()
        .to_string()
}

#[test]
fn config_hash_prints_hash_and_canonical_json() {
    let mut cmd = Command::cargo_bin("fw").unwrap();
    cmd.args(["config-hash", &repo_config("base.yaml")]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("config_hash="))
        .stdout(predicate::str::contains("\"timezone\":\"Asia/Manila\""));
}

#[test]
fn config_hash_fails_on_missing_file() {
    let mut cmd = Command::cargo_bin("fw").unwrap();
    cmd.args(["config-hash", &repo_config("does-not-exist.yaml")]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read yaml path"));
}

/// Arguments are validated before any connection is attempted, so these run
/// without a database.
#[test]
fn roll_call_rejects_unknown_shift_type() {
    let mut cmd = Command::cargo_bin("fw").unwrap();
    cmd.env_remove("FW_DATABASE_URL")
        .args(["roll-call", "--shift-type", "LUNCH", "--date", "2025-03-01"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("unknown shift type"));
}

#[test]
fn leaderboard_rejects_bad_date_and_zero_limit() {
    let mut cmd = Command::cargo_bin("fw").unwrap();
    cmd.env_remove("FW_DATABASE_URL")
        .args(["leaderboard", "--date", "03/01/2025"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));

    let mut cmd = Command::cargo_bin("fw").unwrap();
    cmd.env_remove("FW_DATABASE_URL")
        .args(["leaderboard", "--date", "2025-03-01", "--limit", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("limit must be at least 1"));
}
