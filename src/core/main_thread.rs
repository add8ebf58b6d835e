//! The main thread singleton
//!
//! The process's original thread is never started through this crate, yet
//! code running on it still needs an identity. It gets a fixed [`ThreadRef`]
//! with id 0, no target and no native handle, created once per process.

use crate::core::current;
use crate::core::thread::ThreadRef;
use crate::core::types::MAIN_THREAD_ID;
use std::sync::OnceLock;

/// Name given to the main thread unless configured otherwise
pub const DEFAULT_MAIN_NAME: &str = "Thread-Main";

static MAIN: OnceLock<ThreadRef> = OnceLock::new();

/// Create the singleton with `name`
///
/// Returns `false` if the singleton already exists, in which case the name is
/// left unchanged.
pub(crate) fn init_main(name: &str) -> bool {
    let mut created = false;
    MAIN.get_or_init(|| {
        created = true;
        ThreadRef::new_idle(MAIN_THREAD_ID, name.to_string())
    });
    created
}

/// The main thread singleton
///
/// Created with [`DEFAULT_MAIN_NAME`] on first use if [`Strand::start`]
/// never ran.
///
/// [`Strand::start`]: crate::Strand::start
pub fn main_thread() -> ThreadRef {
    MAIN.get_or_init(|| ThreadRef::new_idle(MAIN_THREAD_ID, DEFAULT_MAIN_NAME.to_string()))
        .clone()
}

/// Install the main singleton as the identity of the calling native thread
///
/// Does nothing if the calling thread already has an identity.
pub fn register_main() {
    if current::get_current().is_none() {
        current::set_current(&main_thread());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_singleton_identity() {
        let a = main_thread();
        let b = main_thread();
        assert_eq!(a, b);
        assert!(a.is_main());
        assert_eq!(a.id(), MAIN_THREAD_ID);
        assert!(!a.name().is_empty());
    }

    #[test]
    fn test_late_init_is_rejected() {
        main_thread();
        assert!(!init_main("Renamed-Main"));
        assert_ne!(main_thread().name(), "Renamed-Main");
    }

    #[test]
    fn test_register_main_on_plain_thread() {
        let seen = thread::spawn(|| {
            assert!(current::get_current().is_none());
            register_main();
            register_main();
            current::get_current()
        })
        .join()
        .unwrap();
        assert_eq!(seen, Some(main_thread()));
    }
}
