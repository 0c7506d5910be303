use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

// Gauge bus faults bubble up as exit code 3 with a readable message,
// while the monitor itself keeps running without battery data.
#[rstest]
#[case("sample")]
#[case("init")]
#[case("self-check")]
fn gauge_fault_exits_with_bus_code(#[case] command: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[monitor]\nshutdown_grace_ms = 0\n").unwrap();

    let mut cmd = Command::cargo_bin("psu").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .arg(command)
        .env("PSU_SIM_FAULT", "1");

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("did not answer on the I2C bus"));
}

#[rstest]
fn gauge_fault_json_error() {
    let mut cmd = Command::cargo_bin("psu").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("sample")
        .env("PSU_SIM_FAULT", "1");

    let out = cmd.assert().code(3).get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr.lines().find(|l| l.contains("\"reason\"")).unwrap_or("");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON error");
    assert_eq!(v["reason"], "GaugeBus");
    assert!(v["message"].as_str().unwrap().contains("I2C"));
}

#[rstest]
fn monitor_survives_gauge_fault() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            "[monitor]\ninterval_ms = 10\n\n[persistence]\ndir = \"{}\"\n",
            dir.path().display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("psu").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--log-level")
        .arg("error")
        .args(["monitor", "--run-for-ms", "100"])
        .env("PSU_SIM_FAULT", "1");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("monitor stopped: running"));
}
