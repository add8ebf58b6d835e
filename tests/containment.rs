use std::sync::Arc;
use strand::{Thread, ThreadError, current_thread};
mod common;
use common::{capture_err, err_lines_for};

#[test]
fn test_domain_failure_is_contained() {
    let buffer = capture_err();

    let thread = Thread::named("domain-failure", || {
        anyhow::bail!("configuration missing");
    })
    .unwrap();
    thread.start().unwrap();
    thread.join().unwrap();

    let lines = err_lines_for(&buffer, "domain-failure");
    assert_eq!(
        lines,
        vec!["Exception in thread \"domain-failure\": configuration missing".to_string()]
    );
}

#[test]
fn test_runtime_panic_is_contained() {
    let buffer = capture_err();

    let thread = Thread::named("panic-failure", || {
        let values: Vec<u32> = Vec::new();
        let index = values.len() + 3;
        if index > 2 {
            panic!("index {index} out of bounds");
        }
        Ok(())
    })
    .unwrap();
    thread.start().unwrap();
    thread.join().unwrap();

    let lines = err_lines_for(&buffer, "panic-failure");
    assert_eq!(
        lines,
        vec!["Panic in thread \"panic-failure\": index 3 out of bounds".to_string()]
    );
}

#[test]
fn test_unknown_failure_is_contained() {
    let buffer = capture_err();

    let thread = Thread::named("unknown-failure", || {
        std::panic::panic_any(vec![1_u8, 2, 3]);
    })
    .unwrap();
    thread.start().unwrap();
    thread.join().unwrap();

    let lines = err_lines_for(&buffer, "unknown-failure");
    assert_eq!(
        lines,
        vec!["Unknown failure in thread \"unknown-failure\"".to_string()]
    );
}

#[test]
fn test_successful_thread_reports_nothing() {
    let buffer = capture_err();

    let thread = Thread::named("quiet-success", || Ok(())).unwrap();
    thread.start().unwrap();
    thread.join().unwrap();

    assert!(err_lines_for(&buffer, "quiet-success").is_empty());
}

#[test]
fn test_failure_does_not_disturb_siblings() {
    let buffer = capture_err();
    let survivor_done = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let failing = Thread::named("sibling-crash", || panic!("going down")).unwrap();
    let done = Arc::clone(&survivor_done);
    let survivor = Thread::named("sibling-survivor", move || {
        strand::sleep(20)?;
        done.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    failing.start().unwrap();
    survivor.start().unwrap();
    failing.join().unwrap();
    survivor.join().unwrap();

    assert!(survivor_done.load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(err_lines_for(&buffer, "sibling-crash").len(), 1);
    assert!(err_lines_for(&buffer, "sibling-survivor").is_empty());
}

#[test]
fn test_join_result_does_not_carry_target_failure() {
    capture_err();

    let thread = Thread::named("silent-to-joiner", || anyhow::bail!("lost")).unwrap();
    thread.start().unwrap();

    let result: Result<(), ThreadError> = thread.join();
    assert!(result.is_ok());
}

#[test]
fn test_concurrent_error_channel_lines_stay_whole() {
    // Shares the captured error channel with the failure reports of other tests
    let buffer = capture_err();
    const PREFIX: &str = "interleave-check";

    let threads: Vec<Thread> = (0..10)
        .map(|t| {
            let thread = Thread::new(move || {
                let me = current_thread();
                for i in 0..100 {
                    strand::console::err()
                        .write_line(format_args!("{PREFIX} writer={t} seq={i} thread={}", me.name()));
                }
                Ok(())
            });
            thread.start().unwrap();
            thread
        })
        .collect();
    for thread in &threads {
        thread.join().unwrap();
    }

    let contents = buffer.contents();
    let mut seen = vec![vec![false; 100]; 10];
    let mut count = 0;
    for line in contents.lines().filter(|line| line.contains(PREFIX)) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(fields.len(), 4, "malformed line {line:?}");
        assert_eq!(fields[0], PREFIX, "malformed line {line:?}");
        let writer: usize = fields[1].strip_prefix("writer=").unwrap().parse().unwrap();
        let seq: usize = fields[2].strip_prefix("seq=").unwrap().parse().unwrap();
        assert!(fields[3].starts_with("thread=Thread-"));
        seen[writer][seq] = true;
        count += 1;
    }

    assert_eq!(count, 1000);
    assert!(seen.iter().flatten().all(|s| *s));
}
