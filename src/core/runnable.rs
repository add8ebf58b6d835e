/// Work executed by a thread
///
/// `run` consumes the target: a thread runs its target at most once. Returning
/// an error is a domain failure; it is reported on the error channel and does
/// not reach the thread that joins.
///
/// Closures returning `anyhow::Result<()>` implement this trait directly.
///
/// # Example
///
/// ```rust
/// use strand::{Runnable, Thread};
///
/// struct Countdown(u32);
///
/// impl Runnable for Countdown {
///     fn run(self: Box<Self>) -> anyhow::Result<()> {
///         for i in (0..self.0).rev() {
///             strand::outln!("{i}");
///         }
///         Ok(())
///     }
/// }
///
/// let thread = Thread::from_runnable(Box::new(Countdown(3)));
/// thread.start().unwrap();
/// thread.join().unwrap();
/// ```
pub trait Runnable: Send + 'static {
    /// Execute the work
    fn run(self: Box<Self>) -> anyhow::Result<()>;
}

impl<F> Runnable for F
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    fn run(self: Box<Self>) -> anyhow::Result<()> {
        (*self)()
    }
}
