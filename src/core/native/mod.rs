//! Native thread backends
//!
//! A started logical thread owns exactly one [`NativeThread`]. The handle is
//! move-only: it is created by [`Backend::spawn`], joined through `&mut`, and
//! released by consuming it, which ownership guarantees happens once.

#[cfg(unix)]
pub mod posix;
pub mod std_thread;

use crate::core::entry::EntryContext;
use crate::core::error::Result;

/// Owned handle to a running or exited OS thread
pub trait NativeThread: Send {
    /// Block until the OS thread has fully exited
    ///
    /// # Errors
    /// Returns [`ThreadError::Join`](crate::ThreadError::Join) if the OS
    /// reports a join failure. The handle stays valid and the join may be
    /// retried.
    fn join(&mut self) -> Result<()>;

    /// Free OS-level bookkeeping after a successful join
    fn release(self: Box<Self>) {}
}

/// Settings applied when the OS thread is created
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Name of the logical thread, handed to backends that can label threads
    pub name: String,
    /// Requested stack size in bytes, or the platform default
    pub stack_size: Option<usize>,
}

/// Which native threading API backs a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// POSIX threads through `pthread_create` / `pthread_join`
    #[cfg(unix)]
    Posix,
    /// The platform thread API as exposed by `std::thread`
    Std,
}

impl Default for Backend {
    #[cfg(unix)]
    fn default() -> Self {
        Backend::Posix
    }

    #[cfg(not(unix))]
    fn default() -> Self {
        Backend::Std
    }
}

impl Backend {
    /// Spawn an OS thread that runs the entry trampoline with `context`
    ///
    /// # Errors
    /// Returns [`ThreadError::Creation`](crate::ThreadError::Creation) if the
    /// OS cannot create the thread. The context is reclaimed in that case.
    pub(crate) fn spawn(
        self,
        context: EntryContext,
        config: &SpawnConfig,
    ) -> Result<Box<dyn NativeThread>> {
        match self {
            #[cfg(unix)]
            Backend::Posix => Ok(Box::new(posix::PosixThread::spawn(context, config)?)),
            Backend::Std => Ok(Box::new(std_thread::StdThread::spawn(context, config)?)),
        }
    }
}
