//! Logical threads backed by native OS threads
//!
//! A [`Thread`] owns a target, a name and, once started, exactly one native
//! thread handle. Its shared identity, a [`ThreadRef`], is what the running
//! body sees through [`current_thread`].
//!
//! ## Usage
//!
//! ```rust
//! use strand::{Thread, current_thread};
//!
//! let thread = Thread::new(|| {
//!     strand::outln!("hello from {}", current_thread().name());
//!     Ok(())
//! });
//!
//! thread.start().unwrap();
//! thread.join().unwrap();
//! thread.join().unwrap(); // joining again is a no-op
//! ```

use crate::core::counter;
use crate::core::current;
use crate::core::entry::EntryContext;
use crate::core::error::{Result, ThreadError};
use crate::core::logger;
use crate::core::main_thread;
use crate::core::native::{Backend, NativeThread, SpawnConfig};
use crate::core::runnable::Runnable;
use crate::core::types::{Events, MAIN_THREAD_ID, State, ThreadId};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prefix of synthesized thread names
pub const DEFAULT_NAME_PREFIX: &str = "Thread-";

/// State shared between a thread's owner and its running body
pub struct Inner {
    id: ThreadId,
    name: String,
    target: Mutex<Option<Box<dyn Runnable>>>,
    finished: Mutex<bool>,
    done: Condvar,
}

impl Inner {
    /// Take the target out for execution
    pub(crate) fn take_target(&self) -> Option<Box<dyn Runnable>> {
        self.target.lock().take()
    }

    /// Record that the body returned and wake timed joiners
    pub(crate) fn mark_finished(&self) {
        *self.finished.lock() = true;
        self.done.notify_all();
    }

    /// Wait until the body returned, or until `timeout` elapsed
    ///
    /// Returns whether the body finished.
    fn wait_finished(&self, timeout: Option<Duration>) -> bool {
        let mut finished = self.finished.lock();
        match timeout {
            None => {
                while !*finished {
                    self.done.wait(&mut finished);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !*finished {
                    if self.done.wait_until(&mut finished, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        *finished
    }
}

/// Shared identity of a logical thread
///
/// Cheap to clone. Two `ThreadRef`s are equal when they identify the same
/// logical thread.
#[derive(Clone)]
pub struct ThreadRef {
    inner: Arc<Inner>,
}

impl ThreadRef {
    fn new(id: ThreadId, name: String, target: Option<Box<dyn Runnable>>) -> Self {
        ThreadRef {
            inner: Arc::new(Inner {
                id,
                name,
                target: Mutex::new(target),
                finished: Mutex::new(false),
                done: Condvar::new(),
            }),
        }
    }

    /// An identity with no target, never backed by a native thread
    pub(crate) fn new_idle(id: ThreadId, name: String) -> Self {
        Self::new(id, name, None)
    }

    #[cfg(test)]
    pub(crate) fn detached(name: &str) -> Self {
        Self::new_idle(counter::next_thread_id(), name.to_string())
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        ThreadRef { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }

    pub(crate) fn into_inner(self) -> Arc<Inner> {
        self.inner
    }

    /// Name of the thread
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Process-unique identifier of the thread
    pub fn id(&self) -> ThreadId {
        self.inner.id
    }

    /// Whether this is the main thread singleton
    pub fn is_main(&self) -> bool {
        self.inner.id == MAIN_THREAD_ID
    }
}

impl PartialEq for ThreadRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ThreadRef {}

impl fmt::Debug for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadRef")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread[{}]", self.inner.name)
    }
}

enum Lifecycle {
    Created,
    Started(Box<dyn NativeThread>),
    Joined,
}

/// A logical thread
///
/// Created in the `Created` state; [`start`](Thread::start) moves it to
/// `Started` exactly once and [`join`](Thread::join) to `Joined`.
///
/// Dropping a started thread that was not joined blocks until its body
/// finishes, so the native thread never outlives the state it runs against.
pub struct Thread {
    thread: ThreadRef,
    backend: Backend,
    stack_size: Option<usize>,
    lifecycle: Mutex<Lifecycle>,
}

impl Thread {
    /// Create a thread running `f`, with a synthesized name
    pub fn new<F>(f: F) -> Thread
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self::from_runnable(Box::new(f))
    }

    /// Create a thread running a boxed target, with a synthesized name
    pub fn from_runnable(target: Box<dyn Runnable>) -> Thread {
        Builder::new().assemble(Some(target))
    }

    /// Create a thread running `f` under an explicit name
    ///
    /// # Errors
    /// Returns [`ThreadError::IllegalArgument`] if the name is empty or
    /// contains a NUL byte
    pub fn named<F>(name: impl Into<String>, f: F) -> Result<Thread>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Builder::new().name(name).build(f)
    }

    /// Create a builder to configure a new thread
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Identity of the thread running the caller
    ///
    /// See [`current_thread`].
    pub fn current() -> ThreadRef {
        current_thread()
    }

    /// Shared identity of this thread
    pub fn handle(&self) -> &ThreadRef {
        &self.thread
    }

    /// Name of this thread
    pub fn name(&self) -> &str {
        self.thread.name()
    }

    /// Identifier of this thread
    pub fn id(&self) -> ThreadId {
        self.thread.id()
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        match *self.lifecycle.lock() {
            Lifecycle::Created => State::Created,
            Lifecycle::Started(_) => State::Started,
            Lifecycle::Joined => State::Joined,
        }
    }

    /// Whether the thread was started and its body has not returned yet
    pub fn is_alive(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Started(_)) && !*self.thread.inner.finished.lock()
    }

    /// Spawn the native thread and run the target on it
    ///
    /// # Errors
    /// - [`ThreadError::IllegalState`] if the thread was already started
    /// - [`ThreadError::Creation`] if the OS cannot create the thread; the
    ///   thread stays `Created` and keeps its target, so starting may be
    ///   retried
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Created) {
            return Err(ThreadError::IllegalState(format!(
                "{} was already started",
                self.thread
            )));
        }

        let config = SpawnConfig {
            name: self.thread.name().to_string(),
            stack_size: self.stack_size,
        };
        let native = self
            .backend
            .spawn(EntryContext::new(self.thread.clone()), &config)?;

        *lifecycle = Lifecycle::Started(native);
        Ok(())
    }

    /// Block until the thread's body returned, then release its native thread
    ///
    /// Joining a joined thread returns immediately. Failures raised by the
    /// target are not reported here; they went to the error channel.
    ///
    /// # Errors
    /// - [`ThreadError::IllegalState`] if the thread was never started, or if
    ///   a thread tries to join itself
    /// - [`ThreadError::Join`] if the OS fails to join; the thread stays
    ///   `Started` and joining may be retried
    pub fn join(&self) -> Result<()> {
        if self.check_joinable()? == State::Joined {
            return Ok(());
        }

        // Wait without holding the lifecycle lock so state queries stay cheap
        self.thread.inner.wait_finished(None);

        let mut lifecycle = self.lifecycle.lock();
        if let Lifecycle::Started(native) = &mut *lifecycle {
            native.join()?;
            if let Lifecycle::Started(native) = std::mem::replace(&mut *lifecycle, Lifecycle::Joined) {
                native.release();
            }
            logger::log_thread_event(self.id(), self.name(), Events::Join, None);
        }
        Ok(())
    }

    /// Join, giving up after `timeout`
    ///
    /// Returns `Ok(true)` once the thread is joined and `Ok(false)` if the
    /// body was still running when the timeout elapsed. A timed out join
    /// leaves the thread `Started`.
    ///
    /// # Errors
    /// Same as [`join`](Thread::join)
    pub fn join_timeout(&self, timeout: Duration) -> Result<bool> {
        if self.check_joinable()? == State::Joined {
            return Ok(true);
        }

        if !self.thread.inner.wait_finished(Some(timeout)) {
            return Ok(false);
        }
        self.join().map(|()| true)
    }

    fn check_joinable(&self) -> Result<State> {
        let state = self.state();
        match state {
            State::Created => Err(ThreadError::IllegalState(format!(
                "{} was never started",
                self.thread
            ))),
            State::Started if current::get_current().as_ref() == Some(&self.thread) => Err(
                ThreadError::IllegalState(format!("{} cannot join itself", self.thread)),
            ),
            _ => Ok(state),
        }
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.state() == State::Started
            && let Err(e) = self.join()
        {
            // The native handle is detached when the lifecycle drops
            crate::errln!("Failed to join {} on drop: {e}", self.thread);
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .field("backend", &self.backend)
            .finish()
    }
}

impl fmt::Display for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.thread, f)
    }
}

/// Thread factory, used to configure the properties of a new thread
///
/// # Examples
///
/// ```rust
/// use strand::Builder;
///
/// let thread = Builder::new()
///     .name("worker")
///     .stack_size(256 * 1024)
///     .spawn(|| {
///         assert_eq!(strand::current_thread().name(), "worker");
///         Ok(())
///     })
///     .unwrap();
///
/// thread.join().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
    backend: Backend,
}

impl Builder {
    /// Base configuration: synthesized name, default stack, default backend
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Names the thread-to-be
    pub fn name(mut self, name: impl Into<String>) -> Builder {
        self.name = Some(name.into());
        self
    }

    /// Sets the size of the stack (in bytes) for the new thread
    pub fn stack_size(mut self, size: usize) -> Builder {
        self.stack_size = Some(size);
        self
    }

    /// Selects the native threading API
    pub fn backend(mut self, backend: Backend) -> Builder {
        self.backend = backend;
        self
    }

    /// Create a thread running `f`, without starting it
    ///
    /// # Errors
    /// Returns [`ThreadError::IllegalArgument`] if the configured name is
    /// empty or contains a NUL byte
    pub fn build<F>(self, f: F) -> Result<Thread>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.build_runnable(Box::new(f))
    }

    /// Create a thread running a boxed target, without starting it
    ///
    /// # Errors
    /// Same as [`build`](Builder::build)
    pub fn build_runnable(self, target: Box<dyn Runnable>) -> Result<Thread> {
        self.validate()?;
        Ok(self.assemble(Some(target)))
    }

    /// Create a thread without a target; running it performs no work
    ///
    /// # Errors
    /// Same as [`build`](Builder::build)
    pub fn build_idle(self) -> Result<Thread> {
        self.validate()?;
        Ok(self.assemble(None))
    }

    /// Create a thread running `f` and start it
    ///
    /// # Errors
    /// Returns the errors of [`build`](Builder::build) and
    /// [`Thread::start`]
    pub fn spawn<F>(self, f: F) -> Result<Thread>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let thread = self.build(f)?;
        thread.start()?;
        Ok(thread)
    }

    fn validate(&self) -> Result<()> {
        match self.name.as_deref() {
            Some("") => Err(ThreadError::IllegalArgument(
                "thread name must not be empty".to_string(),
            )),
            Some(name) if name.contains('\0') => Err(ThreadError::IllegalArgument(format!(
                "thread name {name:?} contains a NUL byte"
            ))),
            _ => Ok(()),
        }
    }

    fn assemble(self, target: Option<Box<dyn Runnable>>) -> Thread {
        let name = self
            .name
            .unwrap_or_else(|| format!("{DEFAULT_NAME_PREFIX}{}", counter::next_value()));

        Thread {
            thread: ThreadRef::new(counter::next_thread_id(), name, target),
            backend: self.backend,
            stack_size: self.stack_size,
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }
}

/// Identity of the thread running the caller
///
/// Inside a thread body this is that thread. Anywhere else, including the
/// process's original thread, it is the main thread singleton.
pub fn current_thread() -> ThreadRef {
    current::get_current().unwrap_or_else(main_thread::main_thread)
}

/// Suspend the calling thread for at least `millis` milliseconds
///
/// # Errors
/// Returns [`ThreadError::IllegalArgument`] if `millis` is negative
pub fn sleep(millis: i64) -> Result<()> {
    let millis = u64::try_from(millis)
        .map_err(|_| ThreadError::IllegalArgument(format!("negative sleep duration: {millis}ms")))?;
    std::thread::sleep(Duration::from_millis(millis));
    Ok(())
}

/// Hint the scheduler to run another thread
pub fn yield_now() {
    std::thread::yield_now();
}
