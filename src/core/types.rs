use serde::{Deserialize, Serialize};
use std::fmt;

/// Thread identifier type
///
/// Uniquely identifies a logical thread for the lifetime of the process.
/// The main thread singleton always has id 0.
pub type ThreadId = u64;

/// Identifier reserved for the main thread singleton
pub const MAIN_THREAD_ID: ThreadId = 0;

/// Lifecycle state of a logical thread
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum State {
    /// Constructed, not yet backed by a native thread
    Created,
    /// A native thread was spawned and has not been joined
    Started,
    /// The native thread exited and its handle was released
    Joined,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Created => "created",
            State::Started => "started",
            State::Joined => "joined",
        };
        f.write_str(name)
    }
}

/// Lifecycle events recorded by the event logger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Events {
    /// The body of a thread began running on its native thread
    Spawn,
    /// The body of a thread returned
    Exit,
    /// A thread was joined by its owner
    Join,
    /// A failure was contained inside the thread body
    Failure,
}
