use strand::{Events, Strand, Thread, current_thread, main_thread};
mod common;
use common::capture_err;
use tempfile::TempDir;

// Runtime configuration is process-wide, so everything runs in one test
#[test]
fn test_runtime_configuration_and_lifecycle_log() {
    capture_err();
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs/strand_{timestamp}.log");

    assert!(!strand::is_logging_enabled());

    Strand::new()
        .main_name("Primary")
        .with_log(&log_path)
        .register_main()
        .start()
        .expect("Failed to start runtime");

    // Second start is rejected
    assert!(Strand::new().start().is_err());

    assert!(strand::is_logging_enabled());
    let actual_log = strand::get_current_log_file().expect("log file configured");
    assert!(!actual_log.to_string_lossy().contains("{timestamp}"));

    assert_eq!(main_thread().name(), "Primary");
    assert_eq!(current_thread(), main_thread());

    // Registration is per native thread
    let other = std::thread::spawn(current_thread).join().unwrap();
    assert_eq!(other, main_thread());

    let ok = Thread::named("logged-ok", || Ok(())).unwrap();
    let failing = Thread::named("logged-failure", || anyhow::bail!("expected")).unwrap();
    ok.start().unwrap();
    failing.start().unwrap();
    ok.join().unwrap();
    failing.join().unwrap();

    strand::flush_logs().unwrap();
    let contents = std::fs::read_to_string(&actual_log).unwrap();
    let entries: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    let events_for = |name: &str| -> Vec<Events> {
        entries
            .iter()
            .filter(|e| e["name"] == name)
            .map(|e| serde_json::from_value(e["event"].clone()).unwrap())
            .collect()
    };

    assert_eq!(
        events_for("logged-ok"),
        vec![Events::Spawn, Events::Exit, Events::Join]
    );
    assert_eq!(
        events_for("logged-failure"),
        vec![Events::Spawn, Events::Failure, Events::Exit, Events::Join]
    );

    let failure = entries
        .iter()
        .find(|e| e["event"] == "Failure")
        .expect("failure entry");
    assert_eq!(
        failure["detail"],
        "Exception in thread \"logged-failure\": expected"
    );
}
