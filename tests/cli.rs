use std::process::{Command, Output};

fn run_strand(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strand"))
        .args(args)
        .env_remove("RUST_BACKTRACE")
        .output()
        .expect("Failed to run strand binary")
}

fn assert_one_line_per_failure(output: &Output) {
    assert!(output.status.success(), "strand exited with {:?}", output.status);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut lines: Vec<&str> = stderr.lines().collect();
    lines.sort();
    assert_eq!(lines.len(), 3, "unexpected error output:\n{stderr}");

    assert!(lines[0].starts_with("Exception in thread \"Thread-"));
    assert!(lines[0].ends_with("\": worker 0 gave up"));
    assert!(lines[1].starts_with("Panic in thread \"Thread-"));
    assert!(lines[1].ends_with("\": worker 1 panicked"));
    assert!(lines[2].starts_with("Unknown failure in thread \"Thread-"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Thread[Thread-Main] joined 3 threads"));
}

#[test]
fn test_failures_report_exactly_one_line_each() {
    let output = run_strand(&["--threads", "3", "--lines", "0", "--fail"]);
    assert_one_line_per_failure(&output);
}

#[test]
fn test_failures_report_exactly_one_line_each_on_std_backend() {
    let output = run_strand(&["--threads", "3", "--lines", "0", "--fail", "--std-backend"]);
    assert_one_line_per_failure(&output);
}

#[test]
fn test_successful_run_writes_nothing_to_stderr() {
    let output = run_strand(&["--threads", "2", "--lines", "3"]);
    assert!(output.status.success());
    assert!(output.stderr.is_empty());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().filter(|l| l.contains(" line ")).count(), 6);
}

#[test]
fn test_jitter_out_of_range_is_rejected() {
    let output = run_strand(&["--threads", "1", "--jitter", "18446744073709551615"]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}
