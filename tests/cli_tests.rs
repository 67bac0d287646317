use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

fn limitkeeper() -> Command {
    Command::cargo_bin("limitkeeper").expect("binary built")
}

#[test]
fn check_accepts_valid_config() {
    let file = config_file(
        r#"
        commands = [
            "event 29001 amountLimit=50",
            "runner 1.234 47972:-1.5 minBackOdds=2.5 backLimit=40",
        ]

        [funds]
        available_funds = 1000
        "#,
    );

    limitkeeper()
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Startup commands: 2"));
}

#[test]
fn check_rejects_malformed_commands() {
    let file = config_file(r#"commands = ["market 1.2 limit=5", "event 3 amountLimit=1"]"#);

    limitkeeper()
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("market 1.2 limit=5"))
        .stderr(predicate::str::contains("1 of 2 startup commands rejected"));
}

#[test]
fn check_reports_invalid_values() {
    let file = config_file(
        r#"
        [frequency]
        min_period_secs = 30
        max_period_secs = 10
        "#,
    );

    limitkeeper()
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_period_secs"));
}

#[test]
fn check_fails_on_missing_file() {
    limitkeeper()
        .args(["check", "--config", "/nonexistent/limitkeeper.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}
