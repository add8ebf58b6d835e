//! Process-wide output channels
//!
//! Two independent channels, [`out`] and [`err`], wrap stdout and stderr by
//! default. Each call to [`Channel::write`] or [`Channel::write_line`] holds
//! the channel lock for the whole write, so text from concurrent threads is
//! never interleaved inside one call.

use parking_lot::Mutex;
use std::fmt::Display;
use std::io::{self, Write};

/// A synchronized text sink
pub struct Channel {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Channel {
    /// Create a channel writing to `sink`
    pub fn new<W: Write + Send + 'static>(sink: W) -> Self {
        Channel {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Write `text` and flush, as one atomic operation
    pub fn write<T: Display>(&self, text: T) {
        let mut sink = self.sink.lock();
        let _ = write!(sink, "{text}").and_then(|_| sink.flush());
    }

    /// Write `text` followed by a newline and flush, as one atomic operation
    pub fn write_line<T: Display>(&self, text: T) {
        let mut sink = self.sink.lock();
        let _ = writeln!(sink, "{text}").and_then(|_| sink.flush());
    }

    /// Replace the sink, returning the previous one
    ///
    /// Writes already in progress finish on the old sink.
    pub fn redirect<W: Write + Send + 'static>(&self, sink: W) -> Box<dyn Write + Send> {
        std::mem::replace(&mut *self.sink.lock(), Box::new(sink))
    }
}

lazy_static::lazy_static! {
    static ref OUT: Channel = Channel::new(io::stdout());
    static ref ERR: Channel = Channel::new(io::stderr());
}

/// Standard output channel
pub fn out() -> &'static Channel {
    &OUT
}

/// Diagnostic error channel
///
/// Contained thread failures are reported here.
pub fn err() -> &'static Channel {
    &ERR
}

/// Print a formatted line to the standard output channel
#[macro_export]
macro_rules! outln {
    ($($arg:tt)*) => {
        $crate::console::out().write_line(format_args!($($arg)*))
    };
}

/// Print a formatted line to the diagnostic error channel
#[macro_export]
macro_rules! errln {
    ($($arg:tt)*) => {
        $crate::console::err().write_line(format_args!($($arg)*))
    };
}

/// In-memory sink shared between a channel and its reader
///
/// Used to capture channel output.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: std::sync::Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily as UTF-8
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
