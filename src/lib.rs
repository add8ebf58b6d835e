//! # Strand
//!
//! Portable named native threads with per-thread identity and contained
//! failures.
//!
//! A [`Thread`] wraps a target and runs it on its own OS thread. Inside the
//! target, [`current_thread`] resolves to that thread from any call depth.
//! Anything the target raises, an error or a panic, is caught at the native
//! entry point and reported as one line on the [`console::err`] channel; it
//! never crosses into the OS threading runtime and never fails `join`.
//!
//! ## Features
//!
//! - POSIX threads and the standard library thread API behind one contract
//! - Unique default names (`Thread-1`, `Thread-2`, ...) and a main thread
//!   singleton (`Thread-Main`)
//! - Idempotent join, timed join and join-on-drop
//! - Synchronized output channels
//! - Optional JSON lifecycle log
//! - C API through FFI

mod core;
pub use core::{
    Builder, Events, MAIN_THREAD_ID, Result, State, Strand, Thread, ThreadError, ThreadId,
    ThreadRef, console, current_thread,
    entry::Failure,
    logger::{flush_logs, get_current_log_file, is_logging_enabled},
    main_thread::{DEFAULT_MAIN_NAME, main_thread, register_main},
    native::{Backend, NativeThread},
    registry::{active_count, live_threads},
    runnable::Runnable,
    sleep,
    thread::DEFAULT_NAME_PREFIX,
    yield_now,
};

pub mod ffi;
