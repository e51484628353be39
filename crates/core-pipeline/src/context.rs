//! Shared per-run state: the shutdown token, the processed-frame buffer
//! and the frame-rate counter. Built once at manager start and handed to
//! the worker threads by reference; nothing here is a process-wide global.

use core_frame::Frame;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::info;

/// Cooperative shutdown flag. Any thread may request, nobody clears.
#[derive(Debug, Default)]
pub struct ShutdownToken {
    requested: AtomicBool,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// The processed-frame exchange between the processor and the display.
/// Writers and readers copy whole frames under the mutex and hold it only
/// for the memcpy.
pub struct ProcessedFrame {
    buffer: Mutex<Box<Frame>>,
}

impl Default for ProcessedFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessedFrame {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Frame::new_boxed()),
        }
    }

    /// Processor side: publish a finished frame.
    pub fn store(&self, frame: &Frame) {
        let mut guard = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        guard.copy_from(frame);
    }

    /// Display side: take a copy of the latest processed frame.
    pub fn load_into(&self, dest: &mut Frame) {
        let guard = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        dest.copy_from(&guard);
    }
}

/// Frames-per-second bookkeeping for the processor loop. The current
/// value is what the overlay renders.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames_in_window: u32,
    current: u16,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames_in_window: 0,
            current: 0,
        }
    }

    pub fn current(&self) -> u16 {
        self.current
    }

    /// Count one frame; rolls the window and logs once per second.
    pub fn tick(&mut self) {
        self.frames_in_window += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed.as_secs() >= 1 {
            self.current = (self.frames_in_window as f64 / elapsed.as_secs_f64()) as u16;
            self.frames_in_window = 0;
            self.window_start = Instant::now();
            info!(target: "pipeline.fps", fps = self.current, "frame rate");
        }
    }
}

/// Everything the worker loops share for one manager run.
#[derive(Default)]
pub struct Context {
    pub shutdown: ShutdownToken,
    pub processed: ProcessedFrame,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::Point;

    #[test]
    fn shutdown_is_sticky() {
        let token = ShutdownToken::new();
        assert!(!token.requested());
        token.request();
        token.request();
        assert!(token.requested());
    }

    #[test]
    fn processed_frame_round_trips() {
        let shared = ProcessedFrame::new();
        let mut frame = Frame::new_boxed();
        frame.set(Point::new(4, 2), 200);
        shared.store(&frame);

        let mut out = Frame::new_boxed();
        shared.load_into(&mut out);
        assert_eq!(out.get(Point::new(4, 2)), Some(200));
    }

    #[test]
    fn fps_counter_waits_for_a_full_window() {
        let mut fps = FpsCounter::new();
        for _ in 0..5 {
            fps.tick();
        }
        assert_eq!(fps.current(), 0, "no full second elapsed yet");
    }
}
