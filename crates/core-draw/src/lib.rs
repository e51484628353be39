//! Queued debug-overlay drawing.
//!
//! Planning enqueues shapes while it works; a single drain pass paints
//! them onto the processed frame afterwards, in the fixed order pixels ->
//! horizontal lines -> squares -> numbers. The queues are owned by the
//! thread running the planner and are never shared. With drawing disabled
//! every enqueue and the drain are no-ops, so release builds pay nothing
//! for the overlay.

pub mod font;

use core_frame::{Frame, HEIGHT, OverlaySink, WIDTH};
use core_geom::Point;
use font::{DIGIT_HEIGHT, DIGIT_PIXELS, DIGIT_SPACING, DIGIT_WIDTH};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Queue capacities. Pixels dominate because every traced ray mirrors its
/// path into the overlay.
pub const PIXEL_QUEUE_CAP: usize = 2096;
pub const LINE_QUEUE_CAP: usize = 256;
pub const SQUARE_QUEUE_CAP: usize = 256;
pub const NUMBER_QUEUE_CAP: usize = 256;

/// Total enqueue requests dropped on overflow, across all queues.
pub static OVERFLOW_DROPS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy)]
struct QueuedPixel {
    pos: Point,
    color: u8,
}

#[derive(Debug, Clone, Copy)]
struct QueuedLine {
    row: u16,
    color: u8,
}

#[derive(Debug, Clone, Copy)]
struct QueuedSquare {
    center: Point,
    size: u8,
    color: u8,
}

#[derive(Debug, Clone, Copy)]
struct QueuedNumber {
    value: u16,
    start: Point,
    scale: u8,
}

/// The four bounded overlay queues.
#[derive(Debug)]
pub struct DrawQueue {
    enabled: bool,
    pixels: Vec<QueuedPixel>,
    lines: Vec<QueuedLine>,
    squares: Vec<QueuedSquare>,
    numbers: Vec<QueuedNumber>,
    /// One log line per queue per overflow episode; reset by `drain`.
    overflow_logged: [bool; 4],
}

impl DrawQueue {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pixels: Vec::with_capacity(if enabled { PIXEL_QUEUE_CAP } else { 0 }),
            lines: Vec::with_capacity(if enabled { LINE_QUEUE_CAP } else { 0 }),
            squares: Vec::with_capacity(if enabled { SQUARE_QUEUE_CAP } else { 0 }),
            numbers: Vec::with_capacity(if enabled { NUMBER_QUEUE_CAP } else { 0 }),
            overflow_logged: [false; 4],
        }
    }

    /// A queue that ignores everything, for headless runs.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn queued_len(&self) -> usize {
        self.pixels.len() + self.lines.len() + self.squares.len() + self.numbers.len()
    }

    pub fn push_pixel(&mut self, pos: Point, color: u8) {
        if !self.enabled {
            return;
        }
        if self.pixels.len() >= PIXEL_QUEUE_CAP {
            self.overflow_drop(0, "pixel");
            return;
        }
        self.pixels.push(QueuedPixel { pos, color });
    }

    /// Queue a full-width horizontal line.
    pub fn push_line_horiz(&mut self, row: u16, color: u8) {
        if !self.enabled {
            return;
        }
        if self.lines.len() >= LINE_QUEUE_CAP {
            self.overflow_drop(1, "line");
            return;
        }
        self.lines.push(QueuedLine { row, color });
    }

    /// Queue a square centered on `center`; it clips at the frame borders.
    pub fn push_square(&mut self, center: Point, size: u8, color: u8) {
        if !self.enabled {
            return;
        }
        if self.squares.len() >= SQUARE_QUEUE_CAP {
            self.overflow_drop(2, "square");
            return;
        }
        self.squares.push(QueuedSquare {
            center,
            size,
            color,
        });
    }

    /// Queue a decimal number; `start` is its upper-left corner and
    /// `scale` multiplies the 4x7 digit cells uniformly.
    pub fn push_number(&mut self, value: u16, start: Point, scale: u8) {
        if !self.enabled {
            return;
        }
        if self.numbers.len() >= NUMBER_QUEUE_CAP {
            self.overflow_drop(3, "number");
            return;
        }
        self.numbers.push(QueuedNumber {
            value,
            start,
            scale,
        });
    }

    fn overflow_drop(&mut self, queue_idx: usize, queue: &'static str) {
        OVERFLOW_DROPS.fetch_add(1, Ordering::Relaxed);
        if !self.overflow_logged[queue_idx] {
            self.overflow_logged[queue_idx] = true;
            warn!(target: "draw.queue", queue, "overlay queue full, dropping until next drain");
        }
    }

    /// Paint everything queued onto `frame` and clear all queues. Order is
    /// pixels, then lines, then squares, then numbers, so the more
    /// informative shapes end up on top.
    pub fn drain(&mut self, frame: &mut Frame) {
        if !self.enabled {
            return;
        }
        for px in self.pixels.drain(..) {
            frame.set(px.pos, px.color);
        }
        for line in self.lines.drain(..) {
            paint_line_horiz(frame, line.row, line.color);
        }
        for square in self.squares.drain(..) {
            paint_square(frame, square.center, square.size, square.color);
        }
        for number in self.numbers.drain(..) {
            paint_number(frame, number.value, number.start, number.scale);
        }
        self.overflow_logged = [false; 4];
    }
}

impl OverlaySink for DrawQueue {
    fn push_pixel(&mut self, point: Point, color: u8) {
        DrawQueue::push_pixel(self, point, color);
    }
}

fn paint_line_horiz(frame: &mut Frame, row: u16, color: u8) {
    if (row as usize) < HEIGHT {
        frame.row_mut(row as usize).fill(color);
    }
}

fn paint_square(frame: &mut Frame, center: Point, size: u8, color: u8) {
    let radius = (size / 2) as i32;
    let x0 = (center.x as i32 - radius).max(0);
    let x1 = (center.x as i32 - radius + size as i32).min(WIDTH as i32);
    let y0 = (center.y as i32 - radius).max(0);
    let y1 = (center.y as i32 - radius + size as i32).min(HEIGHT as i32);
    for y in y0..y1 {
        frame.row_mut(y as usize)[x0 as usize..x1 as usize].fill(color);
    }
}

fn paint_number(frame: &mut Frame, value: u16, start: Point, scale: u8) {
    let scale = scale.max(1) as usize;
    let digits: Vec<u8> = value
        .to_string()
        .bytes()
        .map(|b| b - b'0')
        .collect();

    // Each digit cell is spacing + scaled glyph width.
    let cell = DIGIT_SPACING + DIGIT_WIDTH * scale;
    for row in 0..DIGIT_HEIGHT {
        let chunk = row * DIGIT_WIDTH;
        for (i, &digit) in digits.iter().enumerate() {
            let glyph = &DIGIT_PIXELS[digit as usize][chunk..chunk + DIGIT_WIDTH];
            for (col, &bit) in glyph.iter().enumerate() {
                if bit == 0 {
                    continue;
                }
                let base_x = start.x as usize + i * cell + DIGIT_SPACING + col * scale;
                let base_y = start.y as usize + row * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (px, py) = (base_x + dx, base_y + dy);
                        if px < WIDTH && py < HEIGHT {
                            frame.row_mut(py)[px] = 255;
                        }
                    }
                }
            }
        }
    }
}
