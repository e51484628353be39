//! Per-pixel visitors for the Bresenham walker and raycast.
//!
//! The reference taxonomy is four fixed behaviors plus a custom hook. The
//! visitor is a trait rather than a function pointer so the walker
//! monomorphizes per visitor and the hot loop pays no indirect call.

use crate::{EDGE, Frame, OVERLAY_LIGHT, WIDTH};
use core_geom::Point;

/// Whether a traversal keeps going after visiting a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// Visits every pixel a walker rasterizes, in order. Returning
/// [`Step::Stop`] terminates the traversal after the current pixel.
pub trait PixelVisitor {
    fn visit(&mut self, frame: &mut Frame, point: Point) -> Step;
}

/// Closures work as one-off visitors.
impl<F> PixelVisitor for F
where
    F: FnMut(&mut Frame, Point) -> Step,
{
    fn visit(&mut self, frame: &mut Frame, point: Point) -> Step {
        self(frame, point)
    }
}

/// Destination for overlay pixels queued during tracing. Implemented by
/// the draw queue; [`NullOverlay`] discards everything for callers that
/// trace without debug rendering.
pub trait OverlaySink {
    fn push_pixel(&mut self, point: Point, color: u8);
}

/// Discards overlay pixels.
pub struct NullOverlay;

impl OverlaySink for NullOverlay {
    fn push_pixel(&mut self, _point: Point, _color: u8) {}
}

impl<S: OverlaySink + ?Sized> OverlaySink for &mut S {
    fn push_pixel(&mut self, point: Point, color: u8) {
        (**self).push_pixel(point, color);
    }
}

/// Queue a light overlay pixel and keep going until the first edge pixel.
pub struct DrawLightStopWhite<S> {
    pub overlay: S,
}

impl<S: OverlaySink> PixelVisitor for DrawLightStopWhite<S> {
    fn visit(&mut self, frame: &mut Frame, point: Point) -> Step {
        if frame.get(point) != Some(EDGE) {
            self.overlay.push_pixel(point, OVERLAY_LIGHT);
            Step::Continue
        } else {
            Step::Stop
        }
    }
}

/// Queue a light overlay pixel on every visited pixel, never stopping.
pub struct DrawLightNoStop<S> {
    pub overlay: S,
}

impl<S: OverlaySink> PixelVisitor for DrawLightNoStop<S> {
    fn visit(&mut self, _frame: &mut Frame, point: Point) -> Step {
        self.overlay.push_pixel(point, OVERLAY_LIGHT);
        Step::Continue
    }
}

/// Permanently paint the visited pixel (and a 2-px horizontal widening)
/// white so later computation sees it as an edge. Never stops.
pub struct DrawPermNoStop;

impl PixelVisitor for DrawPermNoStop {
    fn visit(&mut self, frame: &mut Frame, point: Point) -> Step {
        frame.set(point, EDGE);
        for dx in [-2i16, -1, 1, 2] {
            let x = point.x as i32 + dx as i32;
            if x > 0 && (x as usize) < WIDTH {
                frame.set(Point::new(x as u16, point.y), EDGE);
            }
        }
        Step::Continue
    }
}

/// Stop at the first edge pixel, drawing nothing.
pub struct NoDrawStopWhite;

impl PixelVisitor for NoDrawStopWhite {
    fn visit(&mut self, frame: &mut Frame, point: Point) -> Step {
        if frame.get(point) == Some(EDGE) {
            Step::Stop
        } else {
            Step::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingOverlay(Vec<(Point, u8)>);

    impl OverlaySink for RecordingOverlay {
        fn push_pixel(&mut self, point: Point, color: u8) {
            self.0.push((point, color));
        }
    }

    #[test]
    fn light_stop_white_stops_on_edge() {
        let mut frame = Frame::new_boxed();
        let p = Point::new(5, 5);
        let mut visitor = DrawLightStopWhite {
            overlay: RecordingOverlay(Vec::new()),
        };
        assert_eq!(visitor.visit(&mut frame, p), Step::Continue);
        frame.set(p, EDGE);
        assert_eq!(visitor.visit(&mut frame, p), Step::Stop);
        assert_eq!(visitor.overlay.0, vec![(p, OVERLAY_LIGHT)]);
    }

    #[test]
    fn perm_no_stop_widens_and_continues() {
        let mut frame = Frame::new_boxed();
        let p = Point::new(10, 10);
        assert_eq!(DrawPermNoStop.visit(&mut frame, p), Step::Continue);
        for x in 8..=12u16 {
            assert_eq!(frame.get(Point::new(x, 10)), Some(EDGE));
        }
        assert_eq!(frame.get(Point::new(7, 10)), Some(0));
    }

    #[test]
    fn no_draw_stop_white_reads_only() {
        let mut frame = Frame::new_boxed();
        let p = Point::new(3, 3);
        assert_eq!(NoDrawStopWhite.visit(&mut frame, p), Step::Continue);
        frame.set(p, EDGE);
        assert_eq!(NoDrawStopWhite.visit(&mut frame, p), Step::Stop);
    }
}
