use std::sync::atomic::{AtomicU64, Ordering};

// Global counter for default thread names
static THREAD_NUMBER: AtomicU64 = AtomicU64::new(0);

// Global counter for thread identifiers, 0 is reserved for the main thread
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// Draw the next value for a synthesized thread name
///
/// Values start at 1 and are never reused, so two default names can never
/// collide within a process.
pub fn next_value() -> u64 {
    THREAD_NUMBER.fetch_add(1, Ordering::Relaxed) + 1
}

/// Draw a fresh process-unique thread identifier
pub(crate) fn next_thread_id() -> u64 {
    NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed)
}
