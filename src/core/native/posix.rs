use crate::core::entry::EntryContext;
use crate::core::error::{Result, ThreadError};
use crate::core::native::{NativeThread, SpawnConfig};
use std::ffi::c_void;
use std::io;
use std::mem::MaybeUninit;
use std::ptr;

/// A thread created with `pthread_create`
pub struct PosixThread {
    id: libc::pthread_t,
    joined: bool,
}

// pthread_t is an opaque pointer on some platforms; the id itself may be
// used from any thread.
unsafe impl Send for PosixThread {}

extern "C" fn posix_entry(arg: *mut c_void) -> *mut c_void {
    // SAFETY: `arg` came from `EntryContext::into_raw` in `PosixThread::spawn`
    // and is handed over exactly once.
    let context = unsafe { EntryContext::from_raw(arg) };
    #[cfg(target_os = "linux")]
    set_native_name(context.name());
    context.enter();
    ptr::null_mut()
}

// Linux limits pthread names to 15 bytes plus the terminating NUL
#[cfg(target_os = "linux")]
const NATIVE_NAME_MAX: usize = 15;

/// Label the calling pthread so OS tools show the thread's name
#[cfg(target_os = "linux")]
fn set_native_name(name: &str) {
    let mut end = name.len().min(NATIVE_NAME_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    // Names are validated NUL-free; a failure only loses the label
    if let Ok(name) = std::ffi::CString::new(&name[..end]) {
        // SAFETY: `name` is a valid C string within the length limit
        unsafe {
            libc::pthread_setname_np(libc::pthread_self(), name.as_ptr());
        }
    }
}

impl PosixThread {
    /// Create a joinable pthread running the entry trampoline
    pub fn spawn(context: EntryContext, config: &SpawnConfig) -> Result<Self> {
        let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();

        // SAFETY: attr is initialized by pthread_attr_init before any other use
        // and destroyed exactly once below.
        unsafe {
            check(libc::pthread_attr_init(attr.as_mut_ptr()))?;

            if let Some(size) = config.stack_size {
                let rc = libc::pthread_attr_setstacksize(attr.as_mut_ptr(), size);
                if rc != 0 {
                    libc::pthread_attr_destroy(attr.as_mut_ptr());
                    return Err(ThreadError::Creation(io::Error::from_raw_os_error(rc)));
                }
            }

            let arg = context.into_raw();
            let mut id = MaybeUninit::<libc::pthread_t>::uninit();
            let rc = libc::pthread_create(id.as_mut_ptr(), attr.as_ptr(), posix_entry, arg);
            libc::pthread_attr_destroy(attr.as_mut_ptr());

            if rc != 0 {
                // The thread never started, so the context is still ours
                drop(EntryContext::from_raw(arg));
                return Err(ThreadError::Creation(io::Error::from_raw_os_error(rc)));
            }

            Ok(PosixThread {
                id: id.assume_init(),
                joined: false,
            })
        }
    }
}

impl NativeThread for PosixThread {
    fn join(&mut self) -> Result<()> {
        if self.joined {
            return Ok(());
        }

        // SAFETY: the id refers to a joinable thread that has not been joined
        // or detached yet.
        let rc = unsafe { libc::pthread_join(self.id, ptr::null_mut()) };
        if rc != 0 {
            return Err(ThreadError::Join(io::Error::from_raw_os_error(rc)));
        }

        self.joined = true;
        Ok(())
    }
}

impl Drop for PosixThread {
    fn drop(&mut self) {
        if !self.joined {
            // Never joined: let the OS reclaim the thread when it exits
            // SAFETY: the id is joinable and owned by this handle only.
            unsafe {
                libc::pthread_detach(self.id);
            }
        }
    }
}

fn check(rc: libc::c_int) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(ThreadError::Creation(io::Error::from_raw_os_error(rc)))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use crate::core::native::Backend;
    use crate::core::thread::Builder;
    use std::ffi::CStr;
    use std::sync::mpsc;

    fn native_name() -> String {
        let mut buf = [0 as libc::c_char; 64];
        // SAFETY: the buffer is writable and its length is passed along
        let rc = unsafe { libc::pthread_getname_np(libc::pthread_self(), buf.as_mut_ptr(), buf.len()) };
        assert_eq!(rc, 0);
        // SAFETY: pthread_getname_np NUL-terminates on success
        unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned()
    }

    fn spawn_and_read(name: &str) -> String {
        let (tx, rx) = mpsc::channel();
        let thread = Builder::new()
            .backend(Backend::Posix)
            .name(name)
            .spawn(move || {
                tx.send(native_name())?;
                Ok(())
            })
            .unwrap();
        thread.join().unwrap();
        rx.recv().unwrap()
    }

    #[test]
    fn test_posix_threads_carry_their_name() {
        assert_eq!(spawn_and_read("short-name"), "short-name");
        assert_eq!(spawn_and_read("a-rather-long-thread-name"), "a-rather-long-t");
        // Truncation never splits a multi-byte character
        assert_eq!(spawn_and_read("worker-xéééééé"), "worker-xééé");
    }
}
