// Core types
pub mod types;
pub use types::*;

pub mod error;
pub use error::{Result, ThreadError};

// Output channels
pub mod console;

// Lifecycle logging
pub mod logger;
pub use logger::init_logger;

// Identity and naming
pub mod counter;
pub mod current;
pub mod main_thread;
pub mod registry;

// Execution
pub mod entry;
pub mod native;
pub mod runnable;
pub mod thread;
pub use thread::{Builder, Thread, ThreadRef, current_thread, sleep, yield_now};

use anyhow::{Context, Result as AnyResult};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

static STARTED: AtomicBool = AtomicBool::new(false);

/// Process-wide configuration, applied once at startup
///
/// Starting the runtime is optional: without it the main thread singleton is
/// created on first use with its default name and no lifecycle log is kept.
///
/// # Example
///
/// ```rust,no_run
/// use strand::Strand;
///
/// Strand::new()
///     .with_log("logs/strand_{timestamp}.log")
///     .register_main()
///     .start()
///     .expect("runtime already started");
/// ```
pub struct Strand {
    log_path: Option<PathBuf>,
    main_name: String,
    register_main: bool,
}

impl Default for Strand {
    fn default() -> Self {
        Self::new()
    }
}

impl Strand {
    /// Create a new configuration with default settings
    ///
    /// By default:
    /// - Lifecycle logging is disabled
    /// - The main thread is named "Thread-Main"
    /// - The calling thread is not registered as the main thread
    pub fn new() -> Self {
        Strand {
            log_path: None,
            main_name: main_thread::DEFAULT_MAIN_NAME.to_string(),
            register_main: false,
        }
    }

    /// Activate the lifecycle logger and set the path for the log file
    ///
    /// # Arguments
    /// * `path` - Path to the log file. If the path contains "{timestamp}",
    ///   it will be replaced with the current timestamp.
    pub fn with_log<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.log_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the name of the main thread singleton
    pub fn main_name(mut self, name: impl Into<String>) -> Self {
        self.main_name = name.into();
        self
    }

    /// Install the main thread singleton as the identity of the thread that
    /// calls [`start`](Strand::start)
    pub fn register_main(mut self) -> Self {
        self.register_main = true;
        self
    }

    /// Apply the configuration
    ///
    /// The main singleton may already exist because of an earlier lookup.
    /// That is accepted as long as its name is the configured one. A failed
    /// start leaves the runtime unstarted, so it may be retried.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The runtime was already started
    /// - The main name is empty
    /// - The main thread singleton already exists under another name
    /// - The lifecycle log could not be opened
    pub fn start(self) -> AnyResult<()> {
        if self.main_name.is_empty() {
            anyhow::bail!("Main thread name must not be empty");
        }
        if STARTED.swap(true, Ordering::SeqCst) {
            anyhow::bail!("Strand runtime already started");
        }

        let result = self.apply();
        if result.is_err() {
            STARTED.store(false, Ordering::SeqCst);
        }
        result
    }

    fn apply(self) -> AnyResult<()> {
        entry::install_panic_hook();

        if !main_thread::init_main(&self.main_name) {
            let existing = main_thread::main_thread();
            if existing.name() != self.main_name {
                anyhow::bail!("Main thread already initialized as {:?}", existing.name());
            }
        }

        if let Some(log_path) = self.log_path {
            init_logger(Some(log_path)).context("Failed to initialize logger")?;
        }

        if self.register_main {
            main_thread::register_main();
        }

        Ok(())
    }
}
