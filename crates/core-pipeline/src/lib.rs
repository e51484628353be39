//! Pipeline plumbing: the camera, processor and display loops, the
//! shared context they cooperate through, and the manager that owns their
//! threads and the shutdown discipline.
//!
//! Three independent cooperative loops move frames through the system:
//! the camera publishes raw frames into the `STATE` shared-memory region,
//! the processor polls that region and runs the user computation, the
//! display samples the processed-frame buffer. Any loop failure, or a
//! termination signal, raises the shared shutdown token; the main thread
//! observes it and unwinds everything in a fixed order.

pub mod camera;
pub mod context;
pub mod display;
pub mod manager;
pub mod processor;
pub mod source;

pub use camera::camera_loop;
pub use context::{Context, FpsCounter, ProcessedFrame, ShutdownToken};
pub use display::display_loop;
pub use manager::{ManagerOptions, UserDeinit, run_camera, run_camera_with, run_processor,
    run_processor_with};
pub use processor::{FrameProcessor, POLL_INTERVAL, processor_loop};
pub use source::{CountingSink, FrameSink, FrameSource, TestPatternSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("shared memory: {0}")]
    Shmem(#[from] core_shmem::ShmemError),
    #[error("failed to install signal handlers: {0}")]
    Signals(nix::errno::Errno),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}
