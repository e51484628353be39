//! Adaptive binary segmentation and morphological cleanup.
//!
//! A raw grayscale frame goes through three stages: the frame margins and
//! everything below the driving horizon are force-filled with an adaptive
//! floor color, a look-ahead delta threshold splits the rest into track
//! (0) and edge (255), and a dilate/erode pass closes pinholes in the edge
//! lines. After this module runs, every pixel is exactly 0 or 255.

pub mod morph;

pub use morph::{MorphKernel, dilate, erode};

use core_config::SegmentConfig;
use core_frame::{EDGE, Frame, HEIGHT, TRACK, WIDTH};
use tracing::trace;

/// Run the full cleanup chain in place: margin fill, threshold, then a
/// 3x3 closing (dilate + erode).
pub fn pre_process(frame: &mut Frame, cfg: &SegmentConfig) {
    fill_margins(frame, cfg);
    segment(frame, cfg.threshold, cfg.look_ahead);
    dilate(frame, MorphKernel::Three);
    erode(frame, MorphKernel::Three);
    trace!(target: "segment", "frame segmented");
}

/// Force-fill the dead zones with the adaptive floor color so the
/// threshold pass cannot hallucinate edges off the drivable area: the top
/// `deadzone` rows, everything from the horizon row down, and a
/// `deadzone`-wide strip at the left and right margins.
pub fn fill_margins(frame: &mut Frame, cfg: &SegmentConfig) {
    let deadzone = cfg.deadzone as usize;
    let horizon = cfg.horizon_row as usize;
    let floor = cfg.floor_color as f32;
    for y in 0..HEIGHT {
        // Fades toward black with depth so the fill never contrasts with
        // the real floor enough to trip the threshold.
        let adaptive = (floor - (y as f32 / HEIGHT as f32) * floor) as u8;
        let row = frame.row_mut(y);
        if y < deadzone || y >= horizon {
            row.fill(adaptive);
        } else {
            row[..deadzone].fill(adaptive);
            row[WIDTH - deadzone..].fill(adaptive);
        }
    }
}

/// Look-ahead delta threshold. A pixel becomes an edge iff it differs from
/// the pixel `look_ahead` to its right, or `look_ahead` below, by more
/// than `threshold`. Out-of-frame look-aheads are skipped, which leaves
/// the bottom and right borders black.
///
/// Works in place: the comparison only ever reads pixels at `x +
/// look_ahead` and `y + look_ahead`, which the left-to-right, top-to-
/// bottom walk has not overwritten yet.
pub fn segment(frame: &mut Frame, threshold: u8, look_ahead: u8) {
    let ahead = look_ahead as usize;
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let here = frame.row(y)[x];
            if x + ahead < WIDTH && here.abs_diff(frame.row(y)[x + ahead]) > threshold {
                frame.row_mut(y)[x] = EDGE;
                continue;
            }
            if y + ahead < HEIGHT && here.abs_diff(frame.row(y + ahead)[x]) > threshold {
                frame.row_mut(y)[x] = EDGE;
                continue;
            }
            frame.row_mut(y)[x] = TRACK;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::Point;

    fn checkerboard(frame: &mut Frame, cell: usize) {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let v = if ((x / cell) + (y / cell)) % 2 == 0 { 200 } else { 20 };
                frame.row_mut(y)[x] = v;
            }
        }
    }

    #[test]
    fn segment_output_is_binary() {
        let mut frame = Frame::new_boxed();
        checkerboard(&mut frame, 16);
        segment(&mut frame, 60, 6);
        assert!(frame.as_bytes().iter().all(|&p| p == TRACK || p == EDGE));
    }

    #[test]
    fn full_chain_output_is_binary() {
        let mut frame = Frame::new_boxed();
        checkerboard(&mut frame, 16);
        pre_process(&mut frame, &SegmentConfig::default());
        assert!(frame.as_bytes().iter().all(|&p| p == TRACK || p == EDGE));
    }

    #[test]
    fn uniform_frame_segments_to_all_track() {
        let mut frame = Frame::new_boxed();
        frame.fill(128);
        segment(&mut frame, 60, 6);
        assert!(frame.as_bytes().iter().all(|&p| p == TRACK));
    }

    #[test]
    fn unreadable_look_aheads_leave_border_black() {
        let mut frame = Frame::new_boxed();
        // Maximal contrast everywhere; only pixels with no in-frame
        // look-ahead partner on either axis can stay black.
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                frame.row_mut(y)[x] = if (x + y) % 2 == 0 { 255 } else { 0 };
            }
        }
        segment(&mut frame, 60, 1);
        assert_eq!(frame.row(HEIGHT - 1)[WIDTH - 1], TRACK);
        // One step in from the corner both axes still have partners.
        assert_eq!(frame.row(HEIGHT - 2)[WIDTH - 2], EDGE);
    }

    #[test]
    fn vertical_contrast_line_becomes_edge() {
        let mut frame = Frame::new_boxed();
        frame.fill(20);
        for y in 0..HEIGHT {
            for x in 300..310 {
                frame.row_mut(y)[x] = 220;
            }
        }
        segment(&mut frame, 60, 6);
        // Pixels approaching the bright band from the left see the jump.
        assert_eq!(frame.get(Point::new(296, 100)), Some(EDGE));
        // Far from the band nothing changes.
        assert_eq!(frame.get(Point::new(100, 100)), Some(TRACK));
    }

    #[test]
    fn fill_margins_covers_borders_and_horizon() {
        let mut frame = Frame::new_boxed();
        frame.fill(255);
        let cfg = SegmentConfig::default();
        fill_margins(&mut frame, &cfg);
        // Top dead zone.
        assert!(frame.row(0).iter().all(|&p| p != 255));
        // Below the horizon.
        assert!(frame.row(cfg.horizon_row as usize).iter().all(|&p| p != 255));
        // Side strips.
        assert_ne!(frame.get(Point::new(0, 100)), Some(255));
        assert_ne!(frame.get(Point::new(WIDTH as u16 - 1, 100)), Some(255));
        // Interior above the horizon is untouched.
        assert_eq!(frame.get(Point::new(320, 100)), Some(255));
    }

    #[test]
    fn adaptive_floor_fades_with_depth() {
        let mut frame = Frame::new_boxed();
        frame.fill(255);
        let cfg = SegmentConfig::default();
        fill_margins(&mut frame, &cfg);
        let top = frame.row(0)[0];
        let deep = frame.row(HEIGHT - 1)[0];
        assert!(top > deep, "floor color should fade toward the bottom");
    }
}
