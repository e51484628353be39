//! Shared-memory mappings and semaphore-guarded critical sections.

use crate::sem::NamedSemaphore;
use crate::ShmemError;
use nix::fcntl::OFlag;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap, shm_open};
use nix::sys::stat::Mode;
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::os::fd::OwnedFd;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Which side of a region this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Consumer side: the mapping is read-only.
    ReadOnly,
    /// Producer side: the mapping is read-write.
    ReadWrite,
}

/// RAII mapping of a named shared-memory region laid out as a `T`.
///
/// The region is created (and sized) on first open regardless of side, so
/// producer and consumer can start in either order; `Access` only decides
/// the mapping protection. Keeps the fd and the mapped view alive
/// together and unmaps on drop.
#[derive(Debug)]
pub struct ShmMapping<T> {
    view: NonNull<libc::c_void>,
    _fd: OwnedFd,
    access: Access,
    _marker: PhantomData<T>,
}

// SAFETY: the mapping itself is just memory; all concurrent access is
// funneled through the semaphore-guarded sections below.
unsafe impl<T: Send> Send for ShmMapping<T> {}
unsafe impl<T: Send> Sync for ShmMapping<T> {}

impl<T> ShmMapping<T> {
    pub fn open(name: &str, access: Access) -> Result<Self, ShmemError> {
        let size = size_of::<T>();
        // The fd is opened read-write on both sides so a consumer that
        // starts first can still size a fresh region.
        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::from_bits_truncate(0o666),
        )
        .map_err(|errno| ShmemError::ShmOpen {
            name: name.to_string(),
            source: errno,
        })?;

        // All peers agree on the record layout, so sizing to it is
        // idempotent whether the region is fresh or already mapped.
        nix::unistd::ftruncate(&fd, size as libc::off_t).map_err(|errno| {
            ShmemError::ShmResize {
                name: name.to_string(),
                source: errno,
            }
        })?;

        let prot = match access {
            Access::ReadOnly => ProtFlags::PROT_READ,
            Access::ReadWrite => ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
        };
        let length = NonZeroUsize::new(size).ok_or(ShmemError::ZeroSized)?;
        // SAFETY: fd is a valid shm object of at least `size` bytes.
        let view = unsafe { mmap(None, length, prot, MapFlags::MAP_SHARED, &fd, 0) }.map_err(
            |errno| ShmemError::Map {
                name: name.to_string(),
                source: errno,
            },
        )?;
        debug!(target: "shmem", name, size, ?access, "region mapped");
        Ok(Self {
            view,
            _fd: fd,
            access,
            _marker: PhantomData,
        })
    }

    pub fn access(&self) -> Access {
        self.access
    }

    fn ptr(&self) -> *mut T {
        self.view.as_ptr().cast()
    }
}

impl<T> Drop for ShmMapping<T> {
    fn drop(&mut self) {
        // SAFETY: view/size are the values the mapping was created with.
        if let Err(errno) = unsafe { munmap(self.view, size_of::<T>()) } {
            warn!(target: "shmem", %errno, "munmap failed during drop");
        }
    }
}

/// Posts the semaphore and clears the held flag if the critical section
/// unwinds before its explicit release.
struct PostOnUnwind<'a> {
    sem: &'a NamedSemaphore,
    held: &'a AtomicBool,
    armed: bool,
}

impl Drop for PostOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.sem.post() {
                warn!(target: "shmem", error = %e, "semaphore post failed while unwinding");
            }
            self.held.store(false, Ordering::Release);
        }
    }
}

/// A shared region plus the named semaphore that guards it. Every access
/// is a scoped critical section; the `held` flag lets cleanup recover a
/// semaphore abandoned mid-section by a fatal signal.
#[derive(Debug)]
pub struct GuardedRegion<T> {
    mapping: ShmMapping<T>,
    sem: NamedSemaphore,
    held: AtomicBool,
}

impl<T> GuardedRegion<T> {
    pub fn open(shm_name: &str, sem_name: &str, access: Access) -> Result<Self, ShmemError> {
        let mapping = ShmMapping::open(shm_name, access)?;
        let sem = NamedSemaphore::open(sem_name)?;
        Ok(Self {
            mapping,
            sem,
            held: AtomicBool::new(false),
        })
    }

    /// Run `f` with exclusive, mutable access to the record. Requires the
    /// producer side.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ShmemError> {
        if self.mapping.access() != Access::ReadWrite {
            return Err(ShmemError::ReadOnly);
        }
        self.sem.wait()?;
        self.held.store(true, Ordering::Release);
        let mut guard = PostOnUnwind {
            sem: &self.sem,
            held: &self.held,
            armed: true,
        };
        // SAFETY: the semaphore serializes every peer that honors the
        // contract; the mapping is writable.
        let result = f(unsafe { &mut *self.mapping.ptr() });
        guard.armed = false;
        drop(guard);
        self.sem.post()?;
        self.held.store(false, Ordering::Release);
        Ok(result)
    }

    /// Run `f` with shared access to the record, inside the critical
    /// section. Works on either side.
    pub fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ShmemError> {
        self.sem.wait()?;
        self.held.store(true, Ordering::Release);
        let mut guard = PostOnUnwind {
            sem: &self.sem,
            held: &self.held,
            armed: true,
        };
        // SAFETY: as above, reads only.
        let result = f(unsafe { &*self.mapping.ptr() });
        guard.armed = false;
        drop(guard);
        self.sem.post()?;
        self.held.store(false, Ordering::Release);
        Ok(result)
    }

    /// Racy read of a single field outside the critical section, used for
    /// freshness polling. The closure receives a raw pointer and must
    /// limit itself to a volatile read of one field; the authoritative
    /// value has to be re-read inside `with_ref`.
    pub fn peek<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
        f(self.mapping.ptr())
    }

    /// Whether this process is currently inside a critical section. Racy
    /// by nature; only the cleanup path consults it.
    pub fn section_open(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Cleanup path: post the semaphore if a section was left open by an
    /// interrupted thread, so peer processes cannot deadlock.
    pub fn release_if_held(&self) {
        if self.held.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.sem.post() {
                warn!(target: "shmem", error = %e, "failed to release abandoned semaphore");
            } else {
                debug!(target: "shmem", "released semaphore abandoned mid-section");
            }
        }
    }
}
