//! Per-native-thread identity slot
//!
//! Each native thread running a logical thread's body carries a weak
//! back-reference to that thread's shared state. The slot never owns the
//! state: the trampoline keeps it alive for as long as the body runs.

use crate::core::thread::{Inner, ThreadRef};
use std::cell::RefCell;
use std::sync::{Arc, Weak};

thread_local! {
    static CURRENT: RefCell<Option<Weak<Inner>>> = const { RefCell::new(None) };
}

/// Install `thread` as the identity of the calling native thread
///
/// Called once per native thread, at body entry, before any user code runs.
pub fn set_current(thread: &ThreadRef) {
    CURRENT.with(|slot| {
        let mut slot = slot.borrow_mut();
        debug_assert!(
            slot.as_ref().and_then(Weak::upgrade).is_none(),
            "current thread installed twice on one native thread"
        );
        *slot = Some(Arc::downgrade(thread.inner()));
    });
}

/// Identity installed for the calling native thread, if any
pub fn get_current() -> Option<ThreadRef> {
    CURRENT
        .try_with(|slot| slot.borrow().as_ref().and_then(Weak::upgrade))
        .ok()
        .flatten()
        .map(ThreadRef::from_inner)
}
