//! Integration tests for the `dataforge-bridge` binary entry point.
//!
//! Verifies exit codes and the wording of each outcome on the real binary.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn missing_files_exit_with_usage_error() {
    let mut command = cargo_bin_cmd!("dataforge-bridge");
    command.assert().failure().stderr(contains("<FILE>"));
}

#[test]
fn help_lists_configuration_flags() {
    let mut command = cargo_bin_cmd!("dataforge-bridge");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("--executable").and(contains("must precede the files")));
}

#[test]
fn unknown_executable_is_reported_as_error() {
    let dir = TempDir::new().expect("create temp dir");
    let target = dir.path().join("input.csv");
    fs::write(&target, "id\n").expect("write target");

    let mut command = cargo_bin_cmd!("dataforge-bridge");
    command
        .arg(format!(
            "--executable={}",
            dir.path().join("no-such-dataforge").display()
        ))
        .arg(&target);
    command
        .assert()
        .failure()
        .stderr(contains("Error executing DataForge: executable"))
        .stderr(contains("not found"));
}

#[cfg(unix)]
#[test]
fn tool_output_is_printed_on_success() {
    let dir = TempDir::new().expect("create temp dir");
    let target = dir.path().join("input.csv");
    fs::write(&target, "id\n").expect("write target");
    let script = dir.path().join("dataforge.sh");
    fs::write(&script, "printf 'all rows valid'\n").expect("write script");

    let mut command = cargo_bin_cmd!("dataforge-bridge");
    command
        .env("DATAFORGE_BRIDGE_EXECUTABLE", "/bin/sh")
        .arg(format!("--path-flag={}", script.display()))
        .arg(&target);
    command
        .assert()
        .success()
        .stdout("DataForge output: all rows valid\n");
}

#[cfg(unix)]
#[test]
fn termination_signal_cancels_running_tools() {
    use std::process::{Command, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};

    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let dir = TempDir::new().expect("create temp dir");
    let target = dir.path().join("input.csv");
    fs::write(&target, "id\n").expect("write target");
    let script = dir.path().join("dataforge.sh");
    fs::write(&script, "sleep 30\n").expect("write script");

    let mut child = Command::new(env!("CARGO_BIN_EXE_dataforge-bridge"))
        .arg("--executable=/bin/sh")
        .arg(format!("--path-flag={}", script.display()))
        .arg("--grace-period-ms=200")
        .arg(&target)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn bridge");
    thread::sleep(Duration::from_millis(500));
    let pid = Pid::from_raw(i32::try_from(child.id()).expect("pid fits in i32"));
    kill(pid, Signal::SIGTERM).expect("signal bridge");

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().expect("poll bridge") {
            break status;
        }
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "bridge did not exit after SIGTERM"
        );
        thread::sleep(Duration::from_millis(20));
    };
    assert_eq!(status.code(), Some(1));
}
