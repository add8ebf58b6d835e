use std::sync::OnceLock;
use std::time::Duration;
use strand::console::{self, SharedBuffer};

#[allow(dead_code)]
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

static ERR_CAPTURE: OnceLock<SharedBuffer> = OnceLock::new();

/// Redirect the global error channel into a buffer shared by every test in
/// this binary
pub fn capture_err() -> SharedBuffer {
    ERR_CAPTURE
        .get_or_init(|| {
            let buffer = SharedBuffer::new();
            let _stderr = console::err().redirect(buffer.clone());
            buffer
        })
        .clone()
}

/// Captured error lines that report on the thread called `name`
///
/// Tests run concurrently, so lines are matched by thread name rather than
/// by position.
#[allow(dead_code)]
pub fn err_lines_for(buffer: &SharedBuffer, name: &str) -> Vec<String> {
    let quoted = format!("\"{name}\"");
    buffer
        .contents()
        .lines()
        .filter(|line| line.contains(&quoted))
        .map(str::to_string)
        .collect()
}
