/// FFI bindings for the Strand C API
///
/// This module exposes thread creation, start, join and teardown to C and
/// C++ callers, along with identity lookup, sleeping and the synchronized
/// output channels. Threads are handed out as opaque pointers that must be
/// released with `strand_thread_destroy`.
///
/// Return codes shared by the functions below:
/// * `0` on success
/// * `-1` if a required pointer is NULL or a string is not valid UTF-8
/// * `-2` on an illegal argument or lifecycle state
/// * `-3` if the OS failed to create the thread
/// * `-4` if the OS failed to join the thread
use crate::core::runnable::Runnable;
use crate::core::{Builder, Strand, Thread, ThreadError, console, current_thread, sleep};
use std::ffi::{CStr, c_void};
use std::os::raw::{c_char, c_int, c_long, c_ulong};
use std::ptr;

/// Signature of a C thread target
///
/// The target receives the argument given at creation. A non-zero return
/// value is reported as a failure of the thread.
pub type StrandTargetFn = extern "C" fn(arg: *mut c_void) -> c_int;

struct ForeignTarget {
    run: StrandTargetFn,
    arg: *mut c_void,
}

// The C caller vouches for `arg` being usable from the new thread.
unsafe impl Send for ForeignTarget {}

impl Runnable for ForeignTarget {
    fn run(self: Box<Self>) -> anyhow::Result<()> {
        let rc = (self.run)(self.arg);
        if rc != 0 {
            anyhow::bail!("target returned error code {rc}");
        }
        Ok(())
    }
}

fn error_code(error: &ThreadError) -> c_int {
    match error {
        ThreadError::IllegalArgument(_) | ThreadError::IllegalState(_) => -2,
        ThreadError::Creation(_) => -3,
        ThreadError::Join(_) => -4,
    }
}

fn status(result: crate::Result<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(e) => error_code(&e),
    }
}

/// Convert a nullable C string into an optional `&str`
///
/// # Safety
/// `text` must be NULL or a valid null-terminated string outliving `'a`.
unsafe fn optional_str<'a>(text: *const c_char) -> Result<Option<&'a str>, ()> {
    if text.is_null() {
        return Ok(None);
    }
    // SAFETY: guaranteed by the caller
    unsafe { CStr::from_ptr(text) }
        .to_str()
        .map(Some)
        .map_err(|_| ())
}

/// Copy `name` into a caller buffer of `len` bytes, always NUL terminated
///
/// Returns the full length of `name`, so a caller can detect truncation.
///
/// # Safety
/// `buf` must be NULL or point to at least `len` writable bytes.
unsafe fn copy_name(name: &str, buf: *mut c_char, len: usize) -> c_int {
    if !buf.is_null() && len > 0 {
        let count = name.len().min(len - 1);
        // SAFETY: `count + 1 <= len` bytes are written into `buf`
        unsafe {
            ptr::copy_nonoverlapping(name.as_ptr() as *const c_char, buf, count);
            *buf.add(count) = 0;
        }
    }
    name.len() as c_int
}

/// Initialize the Strand runtime.
///
/// # Arguments
/// * `log_path` - Path to a lifecycle log file as a null-terminated C string,
///   or NULL to disable logging.
/// * `register_main` - Non-zero to register the calling thread as the main
///   thread singleton.
///
/// # Returns
/// * `0` on success
/// * `1` if the runtime could not be started (already started, or the log
///   could not be opened)
/// * `-1` if the log path contains invalid UTF-8
///
/// # Safety
/// The caller must ensure `log_path` is either `NULL` or a valid
/// null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_init(log_path: *const c_char, register_main: c_int) -> c_int {
    // SAFETY: guaranteed by the caller
    let log_path = match unsafe { optional_str(log_path) } {
        Ok(path) => path,
        Err(()) => return -1,
    };

    let mut strand = Strand::new();
    if let Some(path) = log_path {
        strand = strand.with_log(path);
    }
    if register_main != 0 {
        strand = strand.register_main();
    }

    match strand.start() {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Create a thread that will run `run(arg)` once started.
///
/// # Arguments
/// * `run` - Target function, or NULL for a thread that performs no work.
/// * `arg` - Argument passed to the target.
/// * `name` - Thread name as a null-terminated C string, or NULL for a
///   synthesized name.
///
/// # Returns
/// * Opaque pointer to the thread, or NULL if the name is invalid
///
/// # Safety
/// - `name` must be NULL or a valid null-terminated string.
/// - `arg` must stay valid until the thread has been joined.
/// - The returned pointer must be freed with `strand_thread_destroy`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_thread_create(
    run: Option<StrandTargetFn>,
    arg: *mut c_void,
    name: *const c_char,
) -> *mut c_void {
    // SAFETY: guaranteed by the caller
    let name = match unsafe { optional_str(name) } {
        Ok(name) => name,
        Err(()) => return ptr::null_mut(),
    };

    let mut builder = Builder::new();
    if let Some(name) = name {
        builder = builder.name(name);
    }

    let thread = match run {
        Some(run) => builder.build_runnable(Box::new(ForeignTarget { run, arg })),
        None => builder.build_idle(),
    };

    match thread {
        Ok(thread) => Box::into_raw(Box::new(thread)) as *mut c_void,
        Err(_) => ptr::null_mut(),
    }
}

/// Start a thread created with `strand_thread_create`.
///
/// # Returns
/// * `0` on success, `-1` if `thread` is NULL, `-2` if already started,
///   `-3` if the OS could not create the thread (the call may be retried)
///
/// # Safety
/// `thread` must be NULL or a live pointer from `strand_thread_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_thread_start(thread: *mut c_void) -> c_int {
    if thread.is_null() {
        return -1;
    }
    // SAFETY: guaranteed by the caller
    let thread = unsafe { &*(thread as *const Thread) };
    status(thread.start())
}

/// Wait for a started thread to finish.
///
/// Joining an already joined thread returns `0` immediately.
///
/// # Returns
/// * `0` on success, `-1` if `thread` is NULL, `-2` if never started,
///   `-4` on an OS join failure (the call may be retried)
///
/// # Safety
/// `thread` must be NULL or a live pointer from `strand_thread_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_thread_join(thread: *mut c_void) -> c_int {
    if thread.is_null() {
        return -1;
    }
    // SAFETY: guaranteed by the caller
    let thread = unsafe { &*(thread as *const Thread) };
    status(thread.join())
}

/// Destroy a thread.
///
/// A started thread that was not joined is joined first, so this call may
/// block.
///
/// # Safety
/// - `thread` must be NULL or a pointer from `strand_thread_create`.
/// - The pointer must not be used after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_thread_destroy(thread: *mut c_void) {
    if !thread.is_null() {
        // SAFETY: guaranteed by the caller
        unsafe {
            drop(Box::from_raw(thread as *mut Thread));
        }
    }
}

/// Copy the name of a thread into `buf`.
///
/// # Returns
/// * Length of the name in bytes (excluding the terminator), or `-1` if
///   `thread` is NULL. The copy is truncated if `len` is too small.
///
/// # Safety
/// - `thread` must be NULL or a live pointer from `strand_thread_create`.
/// - `buf` must be NULL or point to at least `len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_thread_name(
    thread: *mut c_void,
    buf: *mut c_char,
    len: usize,
) -> c_int {
    if thread.is_null() {
        return -1;
    }
    // SAFETY: guaranteed by the caller
    unsafe {
        let thread = &*(thread as *const Thread);
        copy_name(thread.name(), buf, len)
    }
}

/// Copy the name of the calling thread into `buf`.
///
/// Outside any Strand thread this is the main thread's name.
///
/// # Returns
/// * Length of the name in bytes (excluding the terminator)
///
/// # Safety
/// `buf` must be NULL or point to at least `len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_current_thread_name(buf: *mut c_char, len: usize) -> c_int {
    let current = current_thread();
    // SAFETY: guaranteed by the caller
    unsafe { copy_name(current.name(), buf, len) }
}

/// Get the identifier of the calling thread (`0` for the main thread).
///
/// # Safety
/// This function is safe to call from FFI contexts.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_current_thread_id() -> c_ulong {
    current_thread().id() as c_ulong
}

/// Suspend the calling thread for at least `millis` milliseconds.
///
/// # Returns
/// * `0` on success, `-2` if `millis` is negative
///
/// # Safety
/// This function is safe to call from FFI contexts.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_sleep(millis: c_long) -> c_int {
    status(sleep(millis as i64))
}

/// Print a line on the standard output channel.
///
/// # Returns
/// * `0` on success, `-1` if `text` is NULL or not valid UTF-8
///
/// # Safety
/// `text` must be NULL or a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_out_println(text: *const c_char) -> c_int {
    // SAFETY: guaranteed by the caller
    match unsafe { optional_str(text) } {
        Ok(Some(text)) => {
            console::out().write_line(text);
            0
        }
        _ => -1,
    }
}

/// Print a line on the diagnostic error channel.
///
/// # Returns
/// * `0` on success, `-1` if `text` is NULL or not valid UTF-8
///
/// # Safety
/// `text` must be NULL or a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn strand_err_println(text: *const c_char) -> c_int {
    // SAFETY: guaranteed by the caller
    match unsafe { optional_str(text) } {
        Ok(Some(text)) => {
            console::err().write_line(text);
            0
        }
        _ => -1,
    }
}
