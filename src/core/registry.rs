//! Table of threads whose body is currently running
//!
//! The trampoline registers a thread right after installing its identity and
//! removes it right after the body returns. Lifecycle events are forwarded to
//! the event logger when it is enabled.

use crate::core::logger;
use crate::core::types::{Events, ThreadId};
use fxhash::FxHashMap;
use parking_lot::Mutex;

lazy_static::lazy_static! {
    static ref LIVE_THREADS: Mutex<FxHashMap<ThreadId, String>> = Mutex::new(FxHashMap::default());
}

/// Register a thread whose body started running
///
/// # Arguments
/// * `thread_id` - ID of the running thread
/// * `name` - Name of the running thread
pub fn on_thread_spawn(thread_id: ThreadId, name: &str) {
    LIVE_THREADS.lock().insert(thread_id, name.to_string());
    logger::log_thread_event(thread_id, name, Events::Spawn, None);
}

/// Register a thread whose body returned
///
/// # Arguments
/// * `thread_id` - ID of the exiting thread
/// * `name` - Name of the exiting thread
pub fn on_thread_exit(thread_id: ThreadId, name: &str) {
    LIVE_THREADS.lock().remove(&thread_id);
    logger::log_thread_event(thread_id, name, Events::Exit, None);
}

/// Number of threads whose body is currently running
pub fn active_count() -> usize {
    LIVE_THREADS.lock().len()
}

/// Snapshot of running threads as `(id, name)` pairs, sorted by id
pub fn live_threads() -> Vec<(ThreadId, String)> {
    let mut threads: Vec<_> = LIVE_THREADS
        .lock()
        .iter()
        .map(|(id, name)| (*id, name.clone()))
        .collect();
    threads.sort_unstable_by_key(|(id, _)| *id);
    threads
}
