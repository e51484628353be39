//! Named POSIX semaphore wrapper.
//!
//! `nix` does not wrap the named-semaphore family, so the calls go through
//! `libc` directly. The wrapper owns the `sem_t` handle and closes it on
//! drop; unlinking is a separate, explicit operation because the daemon
//! deliberately leaves the names behind for its peer processes.

use crate::ShmemError;
use std::ffi::CString;

#[derive(Debug)]
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: CString,
}

// The sem_t handle is a process-shared kernel object; the libc wait/post
// entry points are thread-safe.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Open (creating if absent) a named binary semaphore with an initial
    /// count of 1.
    pub fn open(name: &str) -> Result<Self, ShmemError> {
        let c_name = CString::new(name)
            .map_err(|_| ShmemError::BadName { name: name.to_string() })?;
        let mode: libc::mode_t = 0o666;
        // SAFETY: the name pointer is valid for the duration of the call.
        // The initial count of 1 only applies when the name is created.
        let sem = unsafe {
            libc::sem_open(c_name.as_ptr(), libc::O_CREAT, mode, 1 as libc::c_uint)
        };
        if std::ptr::eq(sem, libc::SEM_FAILED) {
            return Err(ShmemError::SemOpen {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(Self { sem, name: c_name })
    }

    pub fn wait(&self) -> Result<(), ShmemError> {
        // SAFETY: sem is a valid handle for the lifetime of self.
        if unsafe { libc::sem_wait(self.sem) } == -1 {
            return Err(ShmemError::SemWait {
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    pub fn post(&self) -> Result<(), ShmemError> {
        // SAFETY: sem is a valid handle for the lifetime of self.
        if unsafe { libc::sem_post(self.sem) } == -1 {
            return Err(ShmemError::SemPost {
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Remove the name from the system. Open handles (ours included) stay
    /// valid until closed. Test teardown only.
    pub fn unlink(name: &str) -> Result<(), ShmemError> {
        let c_name = CString::new(name)
            .map_err(|_| ShmemError::BadName { name: name.to_string() })?;
        // SAFETY: valid NUL-terminated pointer.
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } == -1 {
            return Err(ShmemError::SemOpen {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: sem was returned by sem_open and not yet closed.
        if unsafe { libc::sem_close(self.sem) } == -1 {
            tracing::error!(
                target: "shmem.sem",
                name = ?self.name,
                "sem_close failed during drop"
            );
        }
    }
}
