//! Radial-sweep contour tracing.
//!
//! The trace keeps a current point and, at each step, walks a fixed circle
//! of offsets around it until the first edge pixel; that pixel becomes the
//! new current point and the sweep restarts a quarter turn back. Tracing a
//! track edge clockwise follows the right side of the track; counter-
//! clockwise follows the left.

use crate::visit::OverlaySink;
use crate::{EDGE, Frame, HEIGHT, OVERLAY_LIGHT, WIDTH};
use core_geom::{Point, Vec2};
use core_ring::FixedRing;

/// Offsets of a radius-6 circle, ordered Up -> clockwise -> back to Up.
/// Constant for the whole program; the quarter size (9) is what the
/// direction-dependent re-seeding below relies on.
pub static SWEEP_CIRCLE: [Vec2; 36] = [
    Vec2::new(0, -6),
    Vec2::new(1, -6),
    Vec2::new(2, -6),
    Vec2::new(3, -5),
    Vec2::new(4, -5),
    Vec2::new(5, -4),
    Vec2::new(5, -3),
    Vec2::new(6, -2),
    Vec2::new(6, -1),
    Vec2::new(6, 0),
    Vec2::new(6, 1),
    Vec2::new(6, 2),
    Vec2::new(5, 3),
    Vec2::new(5, 4),
    Vec2::new(4, 5),
    Vec2::new(3, 5),
    Vec2::new(2, 6),
    Vec2::new(1, 6),
    Vec2::new(0, 6),
    Vec2::new(-1, 6),
    Vec2::new(-2, 6),
    Vec2::new(-3, 5),
    Vec2::new(-4, 5),
    Vec2::new(-5, 4),
    Vec2::new(-5, 3),
    Vec2::new(-6, 2),
    Vec2::new(-6, 1),
    Vec2::new(-6, 0),
    Vec2::new(-6, -1),
    Vec2::new(-6, -2),
    Vec2::new(-5, -3),
    Vec2::new(-5, -4),
    Vec2::new(-4, -5),
    Vec2::new(-3, -5),
    Vec2::new(-2, -6),
    Vec2::new(-1, -6),
];

/// Safety margin, in pixels, that the trace must stay inside.
pub const TRACE_MARGIN: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    Clockwise,
    CounterClockwise,
}

/// Why a sweep terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    /// Traced the requested number of contour points.
    Ok,
    /// Swept the whole circle without landing on an edge pixel.
    CircleExhausted,
    /// The trace left the safety margin of the frame.
    OutOfBounds,
    /// Hit the per-step cap of consecutive misses.
    RadialLengthExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Last confirmed trace point, always inside the safety margin.
    pub point: Point,
    pub status: SweepStatus,
}

/// Fraction of the circle (0 = up, 0.25 = right, 0.5 = down, 0.75 = left)
/// that a direction vector points at. Used to restart a sweep along the
/// normal of the previous trace step. A zero vector maps to 0 (up).
pub fn sweep_fraction_of(dir: Vec2) -> f32 {
    use std::f32::consts::TAU;
    // atan2(0, 0) is 0 in Rust, so the zero-vector guard is implicit.
    let mut angle = (dir.x as f32).atan2(-(dir.y as f32));
    if angle < 0.0 {
        angle += TAU;
    }
    angle / TAU
}

/// The circle offset a fraction points at; the inverse of
/// [`sweep_fraction_of`], quantized to the 36 table entries. Callers use
/// it to turn a sweep-start fraction back into a probe direction.
pub fn direction_of_fraction(frac: f32) -> Vec2 {
    let len = SWEEP_CIRCLE.len();
    let idx = (frac.rem_euclid(1.0) * len as f32).round() as usize % len;
    SWEEP_CIRCLE[idx]
}

fn inside_margin(p: Point) -> bool {
    p.x > TRACE_MARGIN
        && (p.x as usize) < WIDTH - TRACE_MARGIN as usize
        && p.y > TRACE_MARGIN
        && (p.y as usize) < HEIGHT - TRACE_MARGIN as usize
}

fn clamp_to_margin(p: Point) -> Point {
    Point::new(
        p.x.clamp(TRACE_MARGIN + 1, (WIDTH - TRACE_MARGIN as usize) as u16 - 1),
        p.y.clamp(TRACE_MARGIN + 1, (HEIGHT - TRACE_MARGIN as usize) as u16 - 1),
    )
}

/// Trace a contour for at most `max_points` steps.
///
/// `sweep_start` picks where on the circle each sweep begins, as a
/// fraction (see [`sweep_fraction_of`]); `radial_max` caps how much of the
/// circle one sweep may cover before giving up, also as a fraction.
/// Swept pixels are mirrored to the overlay sink so the debug view shows
/// the search pattern.
pub fn radial_sweep<S: OverlaySink>(
    frame: &Frame,
    start: Point,
    max_points: u16,
    direction: SweepDirection,
    sweep_start: f32,
    radial_max: f32,
    overlay: &mut S,
) -> SweepOutcome {
    let circle = FixedRing::new(&SWEEP_CIRCLE);
    let len = circle.len();
    let quarter = len / 4;
    let radial_limit = ((radial_max.clamp(0.0, 1.0) * len as f32) as usize).max(1);

    let mut idx = (sweep_start.rem_euclid(1.0) * len as f32).round() as usize % len;
    let mut last = start;

    if !inside_margin(last) {
        return SweepOutcome {
            point: clamp_to_margin(last),
            status: SweepStatus::OutOfBounds,
        };
    }

    for _ in 0..max_points {
        let mut hit = false;
        for swept in 0..len {
            if swept >= radial_limit {
                return SweepOutcome {
                    point: last,
                    status: SweepStatus::RadialLengthExceeded,
                };
            }
            let target = last.offset(circle.get(idx));
            if !inside_margin(target) {
                return SweepOutcome {
                    point: last,
                    status: SweepStatus::OutOfBounds,
                };
            }
            overlay.push_pixel(target, OVERLAY_LIGHT);

            if frame.get(target) == Some(EDGE) {
                last = target;
                // Restart the next sweep a quarter turn behind the hit so
                // it looks along the normal of the step just taken.
                idx = match direction {
                    SweepDirection::Clockwise => idx + 3 * quarter,
                    SweepDirection::CounterClockwise => idx + quarter,
                } % len;
                hit = true;
                break;
            }

            idx = match direction {
                SweepDirection::Clockwise => (idx + 1) % len,
                SweepDirection::CounterClockwise => (idx + len - 1) % len,
            };
        }
        if !hit {
            return SweepOutcome {
                point: last,
                status: SweepStatus::CircleExhausted,
            };
        }
    }

    SweepOutcome {
        point: last,
        status: SweepStatus::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::NullOverlay;

    /// Vertical edge line at `x`, from `y0` to `y1` inclusive.
    fn vertical_edge(frame: &mut Frame, x: u16, y0: u16, y1: u16) {
        for y in y0..=y1 {
            frame.set(Point::new(x, y), EDGE);
        }
    }

    #[test]
    fn circle_covers_every_quadrant() {
        assert_eq!(SWEEP_CIRCLE.len(), 36);
        assert!(SWEEP_CIRCLE.iter().any(|v| v.x > 0 && v.y < 0));
        assert!(SWEEP_CIRCLE.iter().any(|v| v.x > 0 && v.y > 0));
        assert!(SWEEP_CIRCLE.iter().any(|v| v.x < 0 && v.y > 0));
        assert!(SWEEP_CIRCLE.iter().any(|v| v.x < 0 && v.y < 0));
    }

    #[test]
    fn fraction_of_cardinal_directions() {
        assert!(sweep_fraction_of(Vec2::new(0, -1)).abs() < 1e-6);
        assert!((sweep_fraction_of(Vec2::new(1, 0)) - 0.25).abs() < 1e-6);
        assert!((sweep_fraction_of(Vec2::new(0, 1)) - 0.5).abs() < 1e-6);
        assert!((sweep_fraction_of(Vec2::new(-1, 0)) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn traces_along_a_vertical_edge() {
        let mut frame = Frame::new_boxed();
        vertical_edge(&mut frame, 200, 50, 400);
        let start = Point::new(200, 390);
        let outcome = radial_sweep(
            &frame,
            start,
            20,
            SweepDirection::CounterClockwise,
            0.0,
            1.0,
            &mut NullOverlay,
        );
        assert_eq!(outcome.status, SweepStatus::Ok);
        // The trace moved up the edge away from the start.
        assert!(outcome.point.y < start.y);
        assert_eq!(outcome.point.x, 200);
    }

    #[test]
    fn empty_frame_exhausts_circle() {
        let frame = Frame::new_boxed();
        let start = Point::new(320, 240);
        let outcome = radial_sweep(
            &frame,
            start,
            20,
            SweepDirection::Clockwise,
            0.0,
            1.0,
            &mut NullOverlay,
        );
        assert_eq!(outcome.status, SweepStatus::CircleExhausted);
        assert_eq!(outcome.point, start);
    }

    #[test]
    fn radial_cap_cuts_sweep_short() {
        let frame = Frame::new_boxed();
        let outcome = radial_sweep(
            &frame,
            Point::new(320, 240),
            20,
            SweepDirection::Clockwise,
            0.0,
            0.25,
            &mut NullOverlay,
        );
        assert_eq!(outcome.status, SweepStatus::RadialLengthExceeded);
    }

    #[test]
    fn start_outside_margin_reports_out_of_bounds() {
        let frame = Frame::new_boxed();
        let outcome = radial_sweep(
            &frame,
            Point::new(2, 240),
            20,
            SweepDirection::Clockwise,
            0.0,
            1.0,
            &mut NullOverlay,
        );
        assert_eq!(outcome.status, SweepStatus::OutOfBounds);
        assert!(inside_margin(outcome.point));
    }

    #[test]
    fn trace_near_border_stays_in_margin() {
        let mut frame = Frame::new_boxed();
        vertical_edge(&mut frame, 15, 5, 470);
        let outcome = radial_sweep(
            &frame,
            Point::new(15, 100),
            u16::MAX,
            SweepDirection::CounterClockwise,
            0.0,
            1.0,
            &mut NullOverlay,
        );
        assert_eq!(outcome.status, SweepStatus::OutOfBounds);
        assert!(inside_margin(outcome.point));
    }
}
