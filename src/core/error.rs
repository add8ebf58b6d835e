use std::io;
use thiserror::Error;

/// Errors surfaced by thread lifecycle operations
///
/// Failures raised by a running target are never reported through this type.
/// They are contained inside the thread and reported on the error channel.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// A caller-supplied value violates a precondition
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// The operation is not valid in the thread's current lifecycle state
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The OS refused to create the native thread
    ///
    /// The thread stays in the `Created` state and may be started again.
    #[error("failed to create native thread: {0}")]
    Creation(#[source] io::Error),

    /// The OS failed while joining the native thread
    ///
    /// The thread stays in the `Started` state and joining may be retried.
    #[error("failed to join native thread: {0}")]
    Join(#[source] io::Error),
}

/// Result alias for thread lifecycle operations
pub type Result<T> = std::result::Result<T, ThreadError>;
