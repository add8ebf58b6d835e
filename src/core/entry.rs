//! Native entry trampoline and failure containment
//!
//! Every backend ends up in [`EntryContext::enter`] on the new OS thread.
//! Nothing raised by the target may unwind past this point: the OS threading
//! runtime is not prepared to receive a Rust panic.

use crate::core::console;
use crate::core::current;
use crate::core::logger;
use crate::core::registry;
use crate::core::thread::{Inner, ThreadRef};
use crate::core::types::Events;
use std::any::Any;
use std::cell::Cell;
use std::ffi::c_void;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

thread_local! {
    // Set while a containment boundary is active on this native thread
    static CONTAINING: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// A failure raised by a thread body and caught at the trampoline
#[derive(Debug)]
pub enum Failure {
    /// The target reported an error, or panicked with an `anyhow::Error`
    Domain(anyhow::Error),
    /// The target panicked with a text message
    Panic(String),
    /// The target panicked with a payload of unknown type
    Unknown,
}

impl Failure {
    /// Classify a panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<anyhow::Error>() {
            Ok(error) => return Failure::Domain(*error),
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<String>() {
            Ok(message) => return Failure::Panic(*message),
            Err(payload) => payload,
        };
        match payload.downcast_ref::<&'static str>() {
            Some(message) => Failure::Panic((*message).to_string()),
            None => Failure::Unknown,
        }
    }

    /// The diagnostic line reported for this failure in thread `name`
    pub fn describe<'a>(&'a self, name: &'a str) -> impl fmt::Display + 'a {
        Report {
            failure: self,
            name,
        }
    }
}

struct Report<'a> {
    failure: &'a Failure,
    name: &'a str,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure {
            Failure::Domain(error) => {
                write!(f, "Exception in thread \"{}\": {}", self.name, one_line(&format!("{error:#}")))
            }
            Failure::Panic(message) => {
                write!(f, "Panic in thread \"{}\": {}", self.name, one_line(message))
            }
            Failure::Unknown => write!(f, "Unknown failure in thread \"{}\"", self.name),
        }
    }
}

// Reports must stay on a single line of the error channel
fn one_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" | ")
}

/// Install the process panic hook used by containment
///
/// The hook stays silent for panics raised inside [`contain`], which are
/// reported as a single line by the trampoline instead. Every other panic is
/// handed to the hook that was installed before.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !is_containing() {
                previous(info);
            }
        }));
    });
}

/// Whether the calling native thread is inside a containment boundary
pub fn is_containing() -> bool {
    // The slot may already be gone while thread locals are torn down
    CONTAINING.try_with(Cell::get).unwrap_or(false)
}

/// Restores the previous containment flag, also when unwinding
struct ContainGuard {
    previous: bool,
}

impl ContainGuard {
    fn enter() -> Self {
        ContainGuard {
            previous: CONTAINING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for ContainGuard {
    fn drop(&mut self) {
        let _ = CONTAINING.try_with(|flag| flag.set(self.previous));
    }
}

/// Run `body` and turn anything it raises into a [`Failure`]
pub fn contain<F>(body: F) -> Result<(), Failure>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    install_panic_hook();
    let outcome = {
        let _guard = ContainGuard::enter();
        panic::catch_unwind(AssertUnwindSafe(body))
    };
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(Failure::Domain(error)),
        Err(payload) => Err(Failure::from_panic(payload)),
    }
}

/// Ownership of a thread's shared state in transit to its native thread
///
/// The context holds one strong reference. It is turned into a raw pointer
/// for backends that take a C start routine and rebuilt on the other side.
pub struct EntryContext {
    thread: ThreadRef,
}

impl EntryContext {
    pub(crate) fn new(thread: ThreadRef) -> Self {
        EntryContext { thread }
    }

    /// Leak the context into a pointer suitable for a native start routine
    pub fn into_raw(self) -> *mut c_void {
        Arc::into_raw(self.thread.into_inner()) as *mut c_void
    }

    /// Name of the thread this context will run
    pub fn name(&self) -> &str {
        self.thread.name()
    }

    /// Rebuild a context from [`EntryContext::into_raw`]
    ///
    /// # Safety
    /// `ptr` must come from `into_raw` and must be rebuilt at most once.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Self {
        // SAFETY: guaranteed by the caller
        let inner = unsafe { Arc::from_raw(ptr as *const Inner) };
        EntryContext {
            thread: ThreadRef::from_inner(inner),
        }
    }

    /// Run the thread body on the calling native thread
    ///
    /// Installs the thread's identity, runs its target inside a containment
    /// boundary and reports any failure on the error channel. Always returns
    /// normally.
    pub fn enter(self) {
        let thread = self.thread;
        current::set_current(&thread);
        registry::on_thread_spawn(thread.id(), thread.name());

        let target = thread.inner().take_target();
        let outcome = contain(|| match target {
            Some(target) => target.run(),
            None => Ok(()),
        });

        if let Err(failure) = outcome {
            // A panicking Display impl inside the report must not escape either
            let _ = contain(|| {
                report(&thread, &failure);
                Ok(())
            });
        }

        registry::on_thread_exit(thread.id(), thread.name());
        thread.inner().mark_finished();
    }
}

fn report(thread: &ThreadRef, failure: &Failure) {
    let line = failure.describe(thread.name()).to_string();
    console::err().write_line(&line);
    logger::log_thread_event(thread.id(), thread.name(), Events::Failure, Some(line));
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_contain_success() {
        assert!(contain(|| Ok(())).is_ok());
    }

    #[test]
    fn test_contain_domain_error() {
        let failure = contain(|| Err(anyhow!("disk full"))).unwrap_err();
        assert!(matches!(failure, Failure::Domain(_)));
        assert_eq!(
            failure.describe("worker").to_string(),
            "Exception in thread \"worker\": disk full"
        );
    }

    #[test]
    fn test_contain_error_chain_on_one_line() {
        let failure = contain(|| {
            Err(anyhow!("inner cause").context("outer context"))
        })
        .unwrap_err();
        assert_eq!(
            failure.describe("worker").to_string(),
            "Exception in thread \"worker\": outer context: inner cause"
        );
    }

    #[test]
    fn test_contain_anyhow_panic_payload() {
        let failure = contain(|| std::panic::panic_any(anyhow!("thrown"))).unwrap_err();
        assert!(matches!(failure, Failure::Domain(ref e) if e.to_string() == "thrown"));
    }

    #[test]
    fn test_contain_string_panics() {
        let failure = contain(|| panic!("index {} out of range", 7)).unwrap_err();
        assert!(matches!(failure, Failure::Panic(ref m) if m == "index 7 out of range"));

        let failure = contain(|| panic!("static message")).unwrap_err();
        assert_eq!(
            failure.describe("t").to_string(),
            "Panic in thread \"t\": static message"
        );
    }

    #[test]
    fn test_contain_unknown_payload() {
        let failure = contain(|| std::panic::panic_any(42_u32)).unwrap_err();
        assert!(matches!(failure, Failure::Unknown));
        assert_eq!(
            failure.describe("t").to_string(),
            "Unknown failure in thread \"t\""
        );
    }

    #[test]
    fn test_containment_flag_scoped_to_body() {
        assert!(!is_containing());

        let mut seen = false;
        let _ = contain(|| {
            seen = is_containing();
            // Nested boundaries restore the outer flag on the way out
            let _ = contain(|| panic!("inner"));
            assert!(is_containing());
            panic!("outer")
        });
        assert!(seen);
        assert!(!is_containing());

        assert!(contain(|| Ok(())).is_ok());
        assert!(!is_containing());
    }

    #[test]
    fn test_multiline_message_is_flattened() {
        let failure = Failure::Panic("first\nsecond".to_string());
        assert_eq!(
            failure.describe("t").to_string(),
            "Panic in thread \"t\": first | second"
        );
    }
}
