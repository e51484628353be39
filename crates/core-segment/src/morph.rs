//! 3x3 and 5x5 morphological dilation and erosion.
//!
//! Both operations run in place on the frame. Output rows are parked in a
//! small ring of pending rows and written back only once no later window
//! can read them, so input and output never alias mid-computation.

use core_frame::{EDGE, Frame, HEIGHT, TRACK, WIDTH};
use std::collections::VecDeque;

/// Structuring element size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphKernel {
    Three,
    Five,
}

impl MorphKernel {
    fn half(self) -> usize {
        match self {
            MorphKernel::Three => 1,
            MorphKernel::Five => 2,
        }
    }

    fn area(self) -> u32 {
        match self {
            MorphKernel::Three => 9,
            MorphKernel::Five => 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MorphOp {
    Dilate,
    Erode,
}

/// Grow edge regions: a pixel becomes 255 iff any neighbor in the window
/// is nonzero.
pub fn dilate(frame: &mut Frame, kernel: MorphKernel) {
    morph(frame, MorphOp::Dilate, kernel);
}

/// Shrink edge regions: a pixel stays 255 iff every neighbor in the
/// window is 255.
pub fn erode(frame: &mut Frame, kernel: MorphKernel) {
    morph(frame, MorphOp::Erode, kernel);
}

fn morph(frame: &mut Frame, op: MorphOp, kernel: MorphKernel) {
    let half = kernel.half();
    let area = kernel.area();
    // Row y is still read while processing rows up to y + half; it may be
    // written back strictly after that.
    let mut pending: VecDeque<(usize, [u8; WIDTH])> = VecDeque::with_capacity(half + 1);

    for y in half..HEIGHT - half {
        while pending.front().is_some_and(|&(wy, _)| wy + half < y) {
            if let Some((wy, row)) = pending.pop_front() {
                frame.row_mut(wy)[half..WIDTH - half].copy_from_slice(&row[half..WIDTH - half]);
            }
        }

        let mut out = [0u8; WIDTH];
        for x in half..WIDTH - half {
            let mut nonzero: u32 = 0;
            let mut full: u32 = 0;
            for wy in y - half..=y + half {
                for wx in x - half..=x + half {
                    let p = frame.row(wy)[wx];
                    nonzero += (p >= 1) as u32;
                    full += (p == EDGE) as u32;
                }
            }
            out[x] = match op {
                MorphOp::Dilate if nonzero >= 1 => EDGE,
                MorphOp::Erode if full == area => EDGE,
                _ => TRACK,
            };
        }
        pending.push_back((y, out));
    }

    for (wy, row) in pending {
        frame.row_mut(wy)[half..WIDTH - half].copy_from_slice(&row[half..WIDTH - half]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::Point;

    fn filled_rect(frame: &mut Frame, x0: u16, y0: u16, x1: u16, y1: u16) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                frame.set(Point::new(x, y), EDGE);
            }
        }
    }

    /// Reference implementation against a copied input, for checking the
    /// in-place row-parking logic.
    fn morph_copied(frame: &Frame, op: MorphOp, kernel: MorphKernel) -> Box<Frame> {
        let half = kernel.half();
        let area = kernel.area();
        let mut out = Frame::new_boxed();
        out.copy_from(frame);
        for y in half..HEIGHT - half {
            for x in half..WIDTH - half {
                let mut nonzero: u32 = 0;
                let mut full: u32 = 0;
                for wy in y - half..=y + half {
                    for wx in x - half..=x + half {
                        let p = frame.row(wy)[wx];
                        nonzero += (p >= 1) as u32;
                        full += (p == EDGE) as u32;
                    }
                }
                out.row_mut(y)[x] = match op {
                    MorphOp::Dilate if nonzero >= 1 => EDGE,
                    MorphOp::Erode if full == area => EDGE,
                    _ => TRACK,
                };
            }
        }
        out
    }

    #[test]
    fn dilate_grows_a_point() {
        let mut frame = Frame::new_boxed();
        frame.set(Point::new(100, 100), EDGE);
        dilate(&mut frame, MorphKernel::Three);
        for y in 99..=101 {
            for x in 99..=101 {
                assert_eq!(frame.get(Point::new(x, y)), Some(EDGE));
            }
        }
        assert_eq!(frame.get(Point::new(98, 100)), Some(TRACK));
    }

    #[test]
    fn erode_removes_a_lone_point() {
        let mut frame = Frame::new_boxed();
        frame.set(Point::new(100, 100), EDGE);
        erode(&mut frame, MorphKernel::Three);
        assert_eq!(frame.get(Point::new(100, 100)), Some(TRACK));
    }

    #[test]
    fn in_place_matches_copied_reference() {
        let mut frame = Frame::new_boxed();
        filled_rect(&mut frame, 50, 50, 90, 70);
        filled_rect(&mut frame, 200, 200, 203, 260);
        frame.set(Point::new(400, 300), EDGE);

        for (op, kernel) in [
            (MorphOp::Dilate, MorphKernel::Three),
            (MorphOp::Erode, MorphKernel::Three),
            (MorphOp::Dilate, MorphKernel::Five),
            (MorphOp::Erode, MorphKernel::Five),
        ] {
            let expected = morph_copied(&frame, op, kernel);
            let mut in_place = Frame::new_boxed();
            in_place.copy_from(&frame);
            morph(&mut in_place, op, kernel);
            assert_eq!(
                in_place.as_bytes(),
                expected.as_bytes(),
                "in-place {op:?} {kernel:?} diverged from the copied reference"
            );
        }
    }

    #[test]
    fn closing_preserves_large_components() {
        let mut frame = Frame::new_boxed();
        filled_rect(&mut frame, 100, 100, 140, 130);
        let before = frame.clone();
        dilate(&mut frame, MorphKernel::Three);
        erode(&mut frame, MorphKernel::Three);
        // Closing on an already-binary frame is the identity for any
        // component larger than the kernel.
        assert_eq!(frame.as_bytes(), before.as_bytes());
    }

    #[test]
    fn closing_fills_pinholes() {
        let mut frame = Frame::new_boxed();
        filled_rect(&mut frame, 100, 100, 140, 130);
        frame.set(Point::new(120, 115), TRACK);
        dilate(&mut frame, MorphKernel::Three);
        erode(&mut frame, MorphKernel::Three);
        assert_eq!(frame.get(Point::new(120, 115)), Some(EDGE));
    }
}
