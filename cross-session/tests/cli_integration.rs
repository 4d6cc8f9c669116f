//! CLI integration tests for cross-session

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Config whose session file lives in `temp_dir`
fn setup_test_env() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let session_path = temp_dir.path().join("session.json");

    fs::write(
        &config_path,
        format!(
            "[session]\npath = \"{}\"\n",
            session_path.to_string_lossy().replace('\\', "\\\\")
        ),
    )
    .unwrap();

    let config_path = config_path.to_string_lossy().to_string();
    (temp_dir, config_path)
}

fn cross_session(config_path: &str) -> Command {
    let mut cmd = Command::cargo_bin("cross-session").unwrap();
    cmd.env("CROSSPOST_CONFIG", config_path);
    cmd
}

#[test]
fn test_set_get_clear_roundtrip() {
    let (temp_dir, config) = setup_test_env();

    cross_session(&config)
        .args(["set", "substack", "--stdin"])
        .write_stdin("substack.sid=abc123\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored substack.session"));

    // Presence only by default
    cross_session(&config)
        .args(["get", "substack"])
        .assert()
        .success()
        .stdout(predicate::str::contains("substack.session: stored"))
        .stdout(predicate::str::contains("abc123").not());

    cross_session(&config)
        .args(["get", "substack.session", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("substack.sid=abc123"));

    let stored = fs::read_to_string(temp_dir.path().join("session.json")).unwrap();
    assert!(stored.contains("substack.session"));

    cross_session(&config)
        .args(["clear", "substack"])
        .assert()
        .success();

    cross_session(&config)
        .args(["get", "substack"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No credential stored"));
}

#[test]
fn test_set_requires_a_value() {
    let (_temp_dir, config) = setup_test_env();

    cross_session(&config)
        .args(["set", "substack"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No value given"));

    cross_session(&config)
        .args(["set", "substack", "--stdin"])
        .write_stdin("   \n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be empty"));
}

#[cfg(unix)]
#[test]
fn test_session_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (temp_dir, config) = setup_test_env();

    cross_session(&config)
        .args(["set", "substack", "cookie"])
        .assert()
        .success();

    let mode = fs::metadata(temp_dir.path().join("session.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}
