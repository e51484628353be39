//! Camera pipeline: pull frames from the source, publish them to `STATE`.

use crate::context::Context;
use crate::source::FrameSource;
use core_frame::Frame;
use core_shmem::StateRegion;
use tracing::{error, info};

/// Cooperative camera loop. Runs until shutdown is requested or the
/// source/region fails; a failure requests shutdown before returning so
/// the manager can unwind the other pipelines.
pub fn camera_loop(ctx: &Context, state: &StateRegion, source: &mut dyn FrameSource) {
    let mut frame = Frame::new_boxed();
    while !ctx.shutdown.requested() {
        if let Err(e) = source.next_frame(&mut frame) {
            error!(target: "pipeline.camera", error = %e, "frame source failed");
            break;
        }
        match state.publish_frame(&frame) {
            Ok(id) => {
                tracing::trace!(target: "pipeline.camera", frame_id = id, "frame published");
            }
            Err(e) => {
                error!(target: "pipeline.camera", error = %e, "state publish failed");
                break;
            }
        }
    }
    info!(target: "pipeline.camera", "camera pipeline stopping");
    ctx.shutdown.request();
}
