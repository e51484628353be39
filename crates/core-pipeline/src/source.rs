//! Collaborator seams: where frames come from and where they go.
//!
//! The video-capture backend and the display window are external to this
//! system; the pipelines only see these two traits. What ships in-tree is
//! the scrolling-gradient test source (handy for checking the whole chain
//! without hardware) and a sink that just counts and logs.

use core_frame::{Frame, HEIGHT, WIDTH};
use std::time::Duration;
use tracing::debug;

/// A producer of raw grayscale frames. `next_frame` blocks until a frame
/// is available and writes it into `dest`; the implementation paces the
/// loop (a real camera delivers at its own rate).
pub trait FrameSource: Send {
    fn next_frame(&mut self, dest: &mut Frame) -> anyhow::Result<()>;
}

/// A consumer of processed frames.
pub trait FrameSink: Send {
    fn present(&mut self, frame: &Frame) -> anyhow::Result<()>;
}

/// Diagonally scrolling grayscale gradient, for pipeline checks without a
/// camera. The gradient advances a fixed fraction of the diagonal per
/// frame and wraps at 1.
pub struct TestPatternSource {
    offset: f32,
    frame_interval: Duration,
}

impl TestPatternSource {
    /// Standard camera pacing (about 30 fps).
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(33))
    }

    pub fn with_interval(frame_interval: Duration) -> Self {
        Self {
            offset: 0.0,
            frame_interval,
        }
    }
}

impl Default for TestPatternSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for TestPatternSource {
    fn next_frame(&mut self, dest: &mut Frame) -> anyhow::Result<()> {
        std::thread::sleep(self.frame_interval);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                // Fraction along the diagonal, scrolled and wrapped.
                let mut t = (x as f32 / WIDTH as f32 + y as f32 / HEIGHT as f32) / 2.0
                    + self.offset;
                if t > 1.0 {
                    t -= 1.0;
                }
                dest.row_mut(y)[x] = (t * 255.0) as u8;
            }
        }
        self.offset += 0.01;
        if self.offset > 1.0 {
            self.offset -= 1.0;
        }
        Ok(())
    }
}

/// Counts presented frames and logs a line every `log_every` frames.
/// Stands in for a display window in headless runs and tests.
pub struct CountingSink {
    presented: u64,
    log_every: u64,
}

impl CountingSink {
    pub fn new(log_every: u64) -> Self {
        Self {
            presented: 0,
            log_every: log_every.max(1),
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for CountingSink {
    fn present(&mut self, _frame: &Frame) -> anyhow::Result<()> {
        self.presented += 1;
        if self.presented % self.log_every == 0 {
            debug!(target: "pipeline.display", frames = self.presented, "frames presented");
        }
        Ok(())
    }
}
