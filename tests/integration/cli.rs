//! Tests for the `runcap` binary

use std::io::Write;
use std::process::Command;

fn runcap() -> Command {
    Command::new(env!("CARGO_BIN_EXE_runcap"))
}

#[test]
fn test_passes_output_through() {
    let output = runcap()
        .args(["--", "/bin/sh", "-c", "echo out; echo err >&2"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("err\n"));
}

#[test]
fn test_propagates_child_exit_code() {
    let output = runcap()
        .args(["--", "/bin/sh", "-c", "exit 4"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn test_timeout_exit_code() {
    let output = runcap()
        .args(["--timeout-ms", "200", "--", "sleep", "30"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn test_output_too_long_exit_code() {
    let output = runcap()
        .args(["--max-output", "100", "--", "yes"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(125));
}

#[test]
fn test_json_result() {
    let output = runcap()
        .args(["--json", "--", "/bin/echo", "<hi>"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stdout"], "&lt;hi&gt;\n");
    assert_eq!(json["stderr"], "");
    assert_eq!(json["isError"], false);
}

#[test]
fn test_raw_json_result() {
    let output = runcap()
        .args(["--json", "--raw", "--", "/bin/echo", "<hi>"])
        .output()
        .unwrap();

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stdout"], "<hi>\n");
}

#[test]
fn test_json_timeout_message() {
    let output = runcap()
        .args(["--json", "--timeout-ms", "200", "--", "sleep", "30"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(124));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["isError"], true);
    assert!(json["stdout"].as_str().unwrap().contains("time limit"));
}

#[test]
fn test_config_file_with_command_override() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "command = [\"/bin/echo\", \"from-file\"]").unwrap();
    writeln!(file, "timeout_ms = 5000").unwrap();

    let from_file = runcap()
        .arg("--config")
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&from_file.stdout), "from-file\n");

    let overridden = runcap()
        .arg("--config")
        .arg(file.path())
        .args(["--", "/bin/echo", "from-args"])
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&overridden.stdout), "from-args\n");
}

#[test]
fn test_missing_command_is_usage_error() {
    let output = runcap().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No command given"));
}

#[test]
fn test_spawn_failure_is_usage_error() {
    let output = runcap()
        .args(["--", "/no/such/program"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("/no/such/program"));
}
