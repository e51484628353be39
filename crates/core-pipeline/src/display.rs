//! Display pipeline: sample the processed-frame buffer and hand copies
//! to the sink at a fixed cadence.

use crate::context::Context;
use crate::source::FrameSink;
use core_frame::Frame;
use crossbeam_channel::tick;
use std::time::Duration;
use tracing::{error, info};

/// Display refresh cadence (about 30 Hz, matching the camera).
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(33);

/// Cooperative display loop.
pub fn display_loop(ctx: &Context, sink: &mut dyn FrameSink) {
    let ticker = tick(REFRESH_INTERVAL);
    let mut frame = Frame::new_boxed();
    while !ctx.shutdown.requested() {
        // The tick channel doubles as the shutdown poll interval.
        if ticker.recv_timeout(REFRESH_INTERVAL).is_err() {
            continue;
        }
        ctx.processed.load_into(&mut frame);
        if let Err(e) = sink.present(&frame) {
            error!(target: "pipeline.display", error = %e, "frame sink failed");
            break;
        }
    }
    info!(target: "pipeline.display", "display pipeline stopping");
    ctx.shutdown.request();
}
