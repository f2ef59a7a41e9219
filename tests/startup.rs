use std::env;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

// Runs the binary outside the crate root so no `.env` file leaks a region in.
fn run(args: &[&str], region_env: Option<&str>) -> (Output, Duration) {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ec2-launch-loop"));
    command
        .args(args)
        .current_dir(env::temp_dir())
        .env_remove("RUST_LOG")
        .env_remove("AWS_REGION");
    if let Some(region) = region_env {
        command.env("AWS_REGION", region);
    }

    let started = Instant::now();
    let output = command.output().expect("Failed to run ec2-launch-loop");
    (output, started.elapsed())
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_no_flags_prints_usage_and_exits_1() {
    let (output, _) = run(&[], None);

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
    assert!(stderr.contains("--launch-template"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_launch_template_exits_1() {
    let (output, elapsed) = run(&["--region", "us-east-1", "-n", "2"], None);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--launch-template is required"));
    assert!(elapsed < Duration::from_secs(10));
}

#[test]
fn test_missing_region_exits_1() {
    let (output, _) = run(&["--launch-template", "web-fleet"], None);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--region (or $AWS_REGION) is required"));
}

#[test]
fn test_empty_region_env_exits_1() {
    let (output, _) = run(&["--launch-template", "web-fleet"], Some(""));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--region (or $AWS_REGION) is required"));
}

#[test]
fn test_unknown_region_is_fatal() {
    let (output, _) = run(
        &["--launch-template", "web-fleet", "--region", "mars-north-1"],
        None,
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("Unknown AWS region: mars-north-1"), "stderr: {}", stderr);
    assert!(!stderr.contains("Usage"));
}
