//! Bresenham line walker and the border-clipped raycast built on it.

use crate::{Frame, HEIGHT, WIDTH};
use crate::visit::{PixelVisitor, Step};
use core_geom::{Point, Vec2};

/// Walk the rasterized line from `start` to `end`, invoking the visitor on
/// every pixel exactly once and in order. Returns the number of visited
/// pixels; a degenerate call with either endpoint out of bounds fails
/// silently with length 0. `start == end` visits exactly one pixel.
pub fn bresenham<V: PixelVisitor>(
    frame: &mut Frame,
    start: Point,
    end: Point,
    visitor: &mut V,
) -> u16 {
    if start.x as usize >= WIDTH
        || end.x as usize >= WIDTH
        || start.y as usize >= HEIGHT
        || end.y as usize >= HEIGHT
    {
        return 0;
    }

    let dx = (end.x as i32 - start.x as i32).abs();
    let sx: i32 = if start.x < end.x { 1 } else { -1 };
    let dy = -(end.y as i32 - start.y as i32).abs();
    let sy: i32 = if start.y < end.y { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = start.x as i32;
    let mut y = start.y as i32;
    let mut length: u16 = 0;

    loop {
        length = length.saturating_add(1);
        if visitor.visit(frame, Point::new(x as u16, y as u16)) == Step::Stop {
            break;
        }
        if x == end.x as i32 && y == end.y as i32 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    length
}

/// Shoot a ray from `start` in the direction `dir`, stretched so the
/// endpoint lands exactly on the nearest frame border, then walk it with
/// the visitor. Zero direction components are guarded (the stretch along
/// that axis is treated as unbounded); an all-zero direction returns 0.
pub fn raycast<V: PixelVisitor>(
    frame: &mut Frame,
    start: Point,
    dir: Vec2,
    visitor: &mut V,
) -> u16 {
    if dir.is_zero() || !frame.contains(start) {
        return 0;
    }

    let stretch_x = if dir.x == 0 {
        f32::INFINITY
    } else if dir.x < 0 {
        start.x as f32 / (dir.x as f32).abs()
    } else {
        (WIDTH as f32 - 1.0 - start.x as f32) / dir.x as f32
    };
    let stretch_y = if dir.y == 0 {
        f32::INFINITY
    } else if dir.y < 0 {
        start.y as f32 / (dir.y as f32).abs()
    } else {
        (HEIGHT as f32 - 1.0 - start.y as f32) / dir.y as f32
    };
    // The limiting axis lands exactly on its border; the other axis is
    // truncated toward the start so rounding can never leave the frame.
    let end = if stretch_x <= stretch_y {
        let x = if dir.x < 0 { 0 } else { WIDTH as u16 - 1 };
        let y = start.y as i32 + (dir.y as f32 * stretch_x) as i32;
        Point::new(x, y as u16)
    } else {
        let x = start.x as i32 + (dir.x as f32 * stretch_y) as i32;
        let y = if dir.y < 0 { 0 } else { HEIGHT as u16 - 1 };
        Point::new(x as u16, y)
    };
    bresenham(frame, start, end, visitor)
}
