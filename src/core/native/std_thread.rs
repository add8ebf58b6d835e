use crate::core::entry::EntryContext;
use crate::core::error::{Result, ThreadError};
use crate::core::native::{NativeThread, SpawnConfig};
use std::io;
use std::thread::{self, JoinHandle};

/// A thread created through `std::thread::Builder`
///
/// On Windows this is a `CreateThread` thread; elsewhere it is whatever the
/// standard library uses natively.
pub struct StdThread {
    handle: Option<JoinHandle<()>>,
}

impl StdThread {
    /// Create a thread running the entry trampoline
    pub fn spawn(context: EntryContext, config: &SpawnConfig) -> Result<Self> {
        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let handle = builder
            .spawn(move || context.enter())
            .map_err(ThreadError::Creation)?;

        Ok(StdThread {
            handle: Some(handle),
        })
    }
}

impl NativeThread for StdThread {
    fn join(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| {
                ThreadError::Join(io::Error::other(
                    "native thread ended with an uncontained panic",
                ))
            }),
            None => Ok(()),
        }
    }
}
