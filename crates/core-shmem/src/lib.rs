//! POSIX shared-memory I/O: the `STATE` and `PLAN` regions.
//!
//! Two named regions carry the whole inter-process surface of the daemon:
//! `STATE` moves raw camera frames from the producer to the processor,
//! `PLAN` moves the per-frame driving plan to the downstream controller.
//! Each region is guarded by a named binary semaphore and only ever
//! touched inside a scoped critical section. All participants agree on
//! the record layouts and the frame geometry at compile time.

pub mod region;
pub mod sem;

pub use region::{Access, GuardedRegion, ShmMapping};
pub use sem::NamedSemaphore;

use core_frame::{FRAME_SIZE, Frame};
use std::ptr::{addr_of, read_volatile};
use thiserror::Error;

pub const STATE_SHM_NAME: &str = "/pland_state";
pub const STATE_SEM_NAME: &str = "/pland_state_sem";
pub const PLAN_SHM_NAME: &str = "/pland_plan";
pub const PLAN_SEM_NAME: &str = "/pland_plan_sem";

#[derive(Debug, Error)]
pub enum ShmemError {
    #[error("region name {name:?} contains a NUL byte")]
    BadName { name: String },
    #[error("shm_open({name}) failed: {source}")]
    ShmOpen {
        name: String,
        source: nix::errno::Errno,
    },
    #[error("sizing {name} failed: {source}")]
    ShmResize {
        name: String,
        source: nix::errno::Errno,
    },
    #[error("mmap({name}) failed: {source}")]
    Map {
        name: String,
        source: nix::errno::Errno,
    },
    #[error("cannot map a zero-sized record")]
    ZeroSized,
    #[error("mutable access to a read-only region")]
    ReadOnly,
    #[error("sem_open({name}) failed: {source}")]
    SemOpen {
        name: String,
        source: std::io::Error,
    },
    #[error("sem_wait failed: {source}")]
    SemWait { source: std::io::Error },
    #[error("sem_post failed: {source}")]
    SemPost { source: std::io::Error },
}

/// Raw camera frame exchange. The producer writes the frame bytes before
/// bumping `frame_id`, both inside the critical section; consumers treat
/// a changed `frame_id` as the freshness key.
#[repr(C)]
pub struct StateRecord {
    pub frame: [u8; FRAME_SIZE],
    pub frame_id: u32,
}

/// The per-frame driving plan. Single writer (the planner); `frame_id` is
/// monotonically non-decreasing modulo 2^32.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRecord {
    pub target_pos: f32,
    pub target_speed: f32,
    pub lap_of_honor: u8,
    pub frame_id: u32,
}

/// The `STATE` region with its domain operations.
pub struct StateRegion {
    region: GuardedRegion<StateRecord>,
}

impl StateRegion {
    pub fn open(access: Access) -> Result<Self, ShmemError> {
        Self::open_named(STATE_SHM_NAME, STATE_SEM_NAME, access)
    }

    /// Open under explicit names. Tests use per-process names so parallel
    /// runs cannot collide.
    pub fn open_named(shm: &str, sem: &str, access: Access) -> Result<Self, ShmemError> {
        Ok(Self {
            region: GuardedRegion::open(shm, sem, access)?,
        })
    }

    /// Producer: store a frame and advance the id by exactly one.
    pub fn publish_frame(&self, frame: &Frame) -> Result<u32, ShmemError> {
        self.region.with_mut(|state| {
            state.frame.copy_from_slice(frame.as_bytes());
            state.frame_id = state.frame_id.wrapping_add(1);
            state.frame_id
        })
    }

    /// Racy freshness probe, intentionally outside the critical section.
    pub fn frame_id_hint(&self) -> u32 {
        // SAFETY: reading a single u32 field of the mapped record; the
        // value is only a hint and is re-read under the semaphore.
        self.region
            .peek(|ptr| unsafe { read_volatile(addr_of!((*ptr).frame_id)) })
    }

    /// Consumer: copy the frame out and return the authoritative id read
    /// inside the critical section.
    pub fn copy_frame_into(&self, dest: &mut Frame) -> Result<u32, ShmemError> {
        self.region.with_ref(|state| {
            dest.as_bytes_mut().copy_from_slice(&state.frame);
            state.frame_id
        })
    }

    pub fn section_open(&self) -> bool {
        self.region.section_open()
    }

    pub fn release_if_held(&self) {
        self.region.release_if_held();
    }
}

/// The `PLAN` region with its domain operations.
pub struct PlanRegion {
    region: GuardedRegion<PlanRecord>,
}

impl PlanRegion {
    pub fn open(access: Access) -> Result<Self, ShmemError> {
        Self::open_named(PLAN_SHM_NAME, PLAN_SEM_NAME, access)
    }

    pub fn open_named(shm: &str, sem: &str, access: Access) -> Result<Self, ShmemError> {
        Ok(Self {
            region: GuardedRegion::open(shm, sem, access)?,
        })
    }

    /// Planner: publish one plan update and advance the id.
    pub fn publish(
        &self,
        target_pos: f32,
        target_speed: f32,
        lap_of_honor: bool,
    ) -> Result<u32, ShmemError> {
        self.region.with_mut(|plan| {
            plan.target_pos = target_pos;
            plan.target_speed = target_speed;
            plan.lap_of_honor = lap_of_honor as u8;
            plan.frame_id = plan.frame_id.wrapping_add(1);
            plan.frame_id
        })
    }

    /// Consumer view of the latest plan.
    pub fn read(&self) -> Result<PlanRecord, ShmemError> {
        self.region.with_ref(|plan| *plan)
    }

    pub fn section_open(&self) -> bool {
        self.region.section_open()
    }

    pub fn release_if_held(&self) {
        self.region.release_if_held();
    }
}

/// Remove a region's name and its semaphore's name from the system. Test
/// teardown; the daemon leaves both behind for its peers.
pub fn unlink_pair(shm_name: &str, sem_name: &str) {
    let c_name = match std::ffi::CString::new(shm_name) {
        Ok(n) => n,
        Err(_) => return,
    };
    // SAFETY: valid NUL-terminated pointer.
    unsafe { libc::shm_unlink(c_name.as_ptr()) };
    let _ = NamedSemaphore::unlink(sem_name);
}
