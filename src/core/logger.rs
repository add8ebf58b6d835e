//! Logger for recording thread lifecycle events
//!
//! This module records when thread bodies start and exit, when threads are
//! joined, and when a failure was contained inside a thread. Entries are
//! written as JSON lines by a background writer thread so that logging never
//! blocks a thread body on file I/O.

use crate::core::types::{Events, ThreadId};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

/// Structure for a single log entry
#[derive(Debug, Serialize, Clone)]
pub struct LogEntry {
    /// Thread the event is about
    pub thread_id: ThreadId,
    /// Name of that thread
    pub name: String,
    /// Type of event that occurred
    pub event: Events,
    /// Absolute timestamp of when the event occurred (seconds since Unix Epoch)
    pub timestamp: f64,
    /// Extra description, e.g. the text of a contained failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Commands for controlling the async logger thread
#[derive(Debug)]
pub enum LoggerCommand {
    /// Write a log entry to the file
    LogEntry(LogEntry),
    /// Flush all pending entries to disk and signal completion
    Flush(Sender<()>),
}

/// Event logger for recording thread lifecycle events
///
/// File writes happen on a dedicated background thread fed through a channel.
pub struct EventLogger {
    /// Channel sender for async communication with logger thread
    sender: Sender<LoggerCommand>,
    /// File the logger writes to, after timestamp substitution
    path: PathBuf,
}

impl Drop for EventLogger {
    fn drop(&mut self) {
        // Make sure queued entries reach the file before the sender closes
        if let Err(e) = self.flush() {
            eprintln!("Warning: Failed to flush logs during EventLogger drop: {e:?}");
        }
    }
}

impl EventLogger {
    /// Create a new logger that writes to the specified file asynchronously
    ///
    /// # Arguments
    /// * `path` - Path to the log file. If it contains "{timestamp}", the
    ///   placeholder is replaced with the current UTC time.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The directory containing the log file could not be created
    /// - The log file could not be opened for writing
    /// - The writer thread could not be spawned
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();

        if let Some(parent) = path_buf.parent()
            && parent.to_string_lossy() != ""
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).context("Failed to create log directory")?;
        }

        #[allow(clippy::literal_string_with_formatting_args)]
        let file_path = if path_buf.to_string_lossy().contains("{timestamp}") {
            let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(
                path_buf
                    .to_string_lossy()
                    .replace("{timestamp}", &timestamp.to_string()),
            )
        } else {
            path_buf
        };

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&file_path)
            .context("Failed to open log file")?;

        let (tx, rx) = channel::<LoggerCommand>();
        thread::Builder::new()
            .name("strand-logger".to_string())
            .spawn(move || async_logger_thread(file, rx))
            .context("Failed to spawn logger thread")?;

        Ok(EventLogger {
            sender: tx,
            path: file_path,
        })
    }

    /// Path of the file this logger writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log a thread event
    ///
    /// Non-blocking: the entry is queued for the writer thread.
    ///
    /// # Arguments
    /// * `thread_id` - ID of the thread involved
    /// * `name` - Name of the thread involved
    /// * `event` - Type of event that occurred
    /// * `detail` - Optional extra description
    pub fn log_thread_event(
        &self,
        thread_id: ThreadId,
        name: &str,
        event: Events,
        detail: Option<String>,
    ) {
        let now = Utc::now();
        let timestamp = now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1_000_000.0;

        let entry = LogEntry {
            thread_id,
            name: name.to_string(),
            event,
            timestamp,
            detail,
        };

        if let Err(e) = self.sender.send(LoggerCommand::LogEntry(entry)) {
            eprintln!("Failed to send log entry: {e:?}");
        }
    }

    /// Force flush all pending log entries to disk
    ///
    /// Blocks until the writer thread confirms the flush.
    ///
    /// # Errors
    /// Returns an error if the writer thread is gone or does not answer in time
    pub fn flush(&self) -> Result<()> {
        let (flush_tx, flush_rx) = channel();
        self.sender.send(LoggerCommand::Flush(flush_tx))?;

        flush_rx
            .recv_timeout(Duration::from_secs(10))
            .context("Flush operation timed out")
    }
}

/// Writer loop run by the logger thread until every sender is dropped
fn async_logger_thread(file: File, rx: Receiver<LoggerCommand>) {
    let mut writer = BufWriter::new(file);

    while let Ok(cmd) = rx.recv() {
        match cmd {
            LoggerCommand::LogEntry(entry) => {
                if let Ok(json) = serde_json::to_string(&entry)
                    && let Err(e) = writeln!(writer, "{json}")
                {
                    eprintln!("Logger write error: {e:?}");
                }
            }
            LoggerCommand::Flush(responder) => {
                if let Err(e) = writer.flush() {
                    eprintln!("Logger flush error: {e:?}");
                }
                let _ = responder.send(());
            }
        }
    }

    if let Err(e) = writer.flush() {
        eprintln!("Logger final flush error: {e:?}");
    }
}

// Global logger instance
lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<Option<EventLogger>> = Mutex::new(None);
}

/// Set the global logger to use the specified file, or disable logging if None
///
/// # Errors
/// Returns an error if the log file cannot be set up
pub fn init_logger<P: AsRef<Path>>(path: Option<P>) -> Result<()> {
    let logger = match path {
        Some(path) => Some(EventLogger::with_file(path).context("Failed to create logger with file")?),
        None => None,
    };

    match GLOBAL_LOGGER.lock() {
        Ok(mut global) => {
            *global = logger;
            Ok(())
        }
        Err(_) => anyhow::bail!("Failed to acquire lock on global logger"),
    }
}

/// Log a thread event to the global logger (if enabled)
pub fn log_thread_event(thread_id: ThreadId, name: &str, event: Events, detail: Option<String>) {
    if let Ok(logger) = GLOBAL_LOGGER.lock()
        && let Some(logger) = logger.as_ref()
    {
        logger.log_thread_event(thread_id, name, event, detail);
    }
}

/// Check if the global logger is enabled
pub fn is_logging_enabled() -> bool {
    GLOBAL_LOGGER
        .lock()
        .map(|logger| logger.is_some())
        .unwrap_or(false)
}

/// Get current log file path
pub fn get_current_log_file() -> Option<PathBuf> {
    GLOBAL_LOGGER
        .lock()
        .ok()
        .and_then(|logger| logger.as_ref().map(|l| l.path().to_path_buf()))
}

/// Flush the global logger, if enabled
///
/// # Errors
/// Returns an error if the flush did not complete
pub fn flush_logs() -> Result<()> {
    match GLOBAL_LOGGER.lock() {
        Ok(logger) => logger.as_ref().map_or(Ok(()), EventLogger::flush),
        Err(_) => anyhow::bail!("Failed to acquire lock on global logger"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_basic_logging() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("basic.log");

        let logger = EventLogger::with_file(&log_path).unwrap();

        logger.log_thread_event(1, "Thread-1", Events::Spawn, None);
        logger.log_thread_event(1, "Thread-1", Events::Failure, Some("boom".into()));
        logger.log_thread_event(1, "Thread-1", Events::Exit, None);
        logger.log_thread_event(1, "Thread-1", Events::Join, None);

        logger.flush().unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("\"thread_id\":1"));
        assert!(lines[0].contains("\"event\":\"Spawn\""));
        assert!(!lines[0].contains("detail"));
        assert!(lines[1].contains("\"detail\":\"boom\""));
        assert!(lines[3].contains("\"event\":\"Join\""));
    }

    #[test]
    fn test_timestamp_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("strand_{timestamp}.log");

        let logger = EventLogger::with_file(&log_path).unwrap();
        let actual = logger.path().to_string_lossy().into_owned();

        assert!(!actual.contains("{timestamp}"));
        assert!(actual.ends_with(".log"));
        assert!(logger.path().exists());
    }

    #[test]
    fn test_creates_missing_directories() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested/dir/events.log");

        let logger = EventLogger::with_file(&log_path).unwrap();
        logger.log_thread_event(2, "worker", Events::Spawn, None);
        logger.flush().unwrap();

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("\"name\":\"worker\""));
    }

    #[test]
    fn test_logger_drop_flushes() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("drop_test.log");

        {
            let logger = EventLogger::with_file(&log_path).unwrap();
            logger.log_thread_event(1, "Thread-1", Events::Spawn, None);
        }

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
