//! Processor pipeline: poll `STATE` for fresh frames, hand them to the
//! user processor, publish the outcome to the processed-frame buffer.

use crate::context::{Context, FpsCounter};
use core_frame::Frame;
use core_shmem::StateRegion;
use std::time::Duration;
use tracing::{error, info};

/// Pause between empty freshness polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// The per-frame computation seam: segmentation, planning, overlay. The
/// processor owns all of its cross-frame state.
pub trait FrameProcessor: Send {
    /// Transform one raw frame in place. `fps` is the measured processing
    /// rate, for the debug overlay.
    fn process(&mut self, frame: &mut Frame, fps: u16) -> anyhow::Result<()>;
}

impl<F> FrameProcessor for F
where
    F: FnMut(&mut Frame, u16) -> anyhow::Result<()> + Send,
{
    fn process(&mut self, frame: &mut Frame, fps: u16) -> anyhow::Result<()> {
        self(frame, fps)
    }
}

/// Cooperative processor loop. Copies a frame out of `STATE` only when
/// `frame_id` moved, never busy-waits, and keeps at most one copy per id.
pub fn processor_loop(ctx: &Context, state: &StateRegion, processor: &mut dyn FrameProcessor) {
    let mut scratch = Frame::new_boxed();
    let mut last_id = state.frame_id_hint();
    let mut fps = FpsCounter::new();

    while !ctx.shutdown.requested() {
        // Cheap racy probe first; the authoritative id is re-read inside
        // the critical section.
        if state.frame_id_hint() == last_id {
            std::thread::sleep(POLL_INTERVAL);
            continue;
        }
        let id = match state.copy_frame_into(&mut scratch) {
            Ok(id) => id,
            Err(e) => {
                error!(target: "pipeline.proc", error = %e, "state read failed");
                break;
            }
        };
        last_id = id;

        if let Err(e) = processor.process(&mut scratch, fps.current()) {
            error!(target: "pipeline.proc", error = %e, "frame processor failed");
            break;
        }
        ctx.processed.store(&scratch);
        fps.tick();
    }
    info!(target: "pipeline.proc", "processor pipeline stopping");
    ctx.shutdown.request();
}
