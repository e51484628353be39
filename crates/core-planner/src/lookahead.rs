//! Track direction estimation and the multi-ray look-ahead fans.

use core_draw::DrawQueue;
use core_frame::{DrawLightStopWhite, Frame, raycast};
use core_geom::{Mat2, Point, Vec2};

/// Rotation matrix for 20 degrees clockwise.
pub const ROT_CW20: Mat2 = Mat2::new(
    0.939_692_620_786,
    -0.342_020_143_326,
    0.342_020_143_326,
    0.939_692_620_786,
);
/// Rotation matrix for 20 degrees counter-clockwise.
pub const ROT_CCW20: Mat2 = Mat2::new(
    0.939_692_620_786,
    0.342_020_143_326,
    -0.342_020_143_326,
    0.939_692_620_786,
);
/// Rotation matrix for 10 degrees clockwise.
pub const ROT_CW10: Mat2 = Mat2::new(
    0.984_807_753_012,
    -0.173_648_177_667,
    0.173_648_177_667,
    0.984_807_753_012,
);
/// Rotation matrix for 10 degrees counter-clockwise.
pub const ROT_CCW10: Mat2 = Mat2::new(
    0.984_807_753_012,
    0.173_648_177_667,
    -0.173_648_177_667,
    0.984_807_753_012,
);

/// Known length the track direction is normalized to before fanning.
pub const DIR_LENGTH: f32 = 40.0;

/// Straight ahead at the standard direction length.
pub const STRAIGHT_AHEAD: Vec2 = Vec2::new(0, -(DIR_LENGTH as i16));

/// Estimate the forward direction of the track from the two traced edge
/// directions. A zero vector marks a missing edge: with one edge missing
/// the other is used directly, with both missing the previous estimate
/// carries over.
pub fn track_direction(left_dir: Vec2, right_dir: Vec2, last_dir: Vec2) -> Vec2 {
    match (left_dir.is_zero(), right_dir.is_zero()) {
        (false, false) => {
            // Normalize both to a common length before averaging so a
            // longer trace cannot dominate the estimate.
            match (left_dir.normalized_to(100.0), right_dir.normalized_to(100.0)) {
                (Some(l), Some(r)) => Vec2::new((l.x + r.x) / 2, (l.y + r.y) / 2),
                _ => last_dir,
            }
        }
        (false, true) => left_dir,
        (true, false) => right_dir,
        (true, true) => last_dir,
    }
}

/// Shoot one overlay-drawing ray and return its length in pixels.
fn shoot(frame: &mut Frame, start: Point, dir: Vec2, queue: &mut DrawQueue) -> u16 {
    let mut visitor = DrawLightStopWhite { overlay: queue };
    raycast(frame, start, dir, &mut visitor)
}

/// Mean length of the five-ray fan (straight plus rotations by 10 and 20
/// degrees either way) cast from the centerline anchor along the track
/// direction. This is the planner's look-ahead distance.
pub fn ray_fan(frame: &mut Frame, start: Point, dir_track: Vec2, queue: &mut DrawQueue) -> u16 {
    let dir = dir_track.normalized_to(DIR_LENGTH).unwrap_or(STRAIGHT_AHEAD);
    let fan = [
        dir,
        ROT_CW20.mul_vec(dir),
        ROT_CCW20.mul_vec(dir),
        ROT_CW10.mul_vec(dir),
        ROT_CCW10.mul_vec(dir),
    ];
    let mut total: u32 = 0;
    for (i, ray) in fan.iter().enumerate() {
        queue.push_square(start.offset(*ray), 10, if i == 0 { 100 } else { 150 });
        total += shoot(frame, start, *ray, queue) as u32;
    }
    (total / fan.len() as u32) as u16
}

/// Fixed-axis probe distances feeding the finish-line detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishProbes {
    pub straight: u16,
    pub diag_left: u16,
    pub diag_right: u16,
    pub horiz_left: u16,
    pub horiz_right: u16,
}

/// Probe the frame along the five fixed finish-detection axes.
pub fn finish_probes(frame: &mut Frame, start: Point, queue: &mut DrawQueue) -> FinishProbes {
    FinishProbes {
        straight: shoot(frame, start, Vec2::new(0, -1), queue),
        diag_left: shoot(frame, start, Vec2::new(-1, -1), queue),
        diag_right: shoot(frame, start, Vec2::new(1, -1), queue),
        horiz_left: shoot(frame, start, Vec2::new(-1, 0), queue),
        horiz_right: shoot(frame, start, Vec2::new(1, 0), queue),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_frame::{EDGE, HEIGHT, WIDTH};

    #[test]
    fn rotations_preserve_length() {
        let v = Vec2::new(0, -40);
        for rot in [ROT_CW20, ROT_CCW20, ROT_CW10, ROT_CCW10] {
            let r = rot.mul_vec(v);
            assert!((r.length() - 40.0).abs() < 1.5, "length drifted: {r:?}");
        }
    }

    #[test]
    fn cw_and_ccw_mirror_each_other() {
        let v = Vec2::new(0, -40);
        let cw = ROT_CW20.mul_vec(v);
        let ccw = ROT_CCW20.mul_vec(v);
        assert_eq!(cw.x, -ccw.x);
        assert_eq!(cw.y, ccw.y);
    }

    #[test]
    fn direction_falls_back_in_order() {
        let last = Vec2::new(5, -30);
        let left = Vec2::new(-20, -60);
        let right = Vec2::new(20, -60);
        // Both edges: symmetric average points straight ahead.
        let both = track_direction(left, right, last);
        assert_eq!(both.x, 0);
        assert!(both.y < 0);
        // One edge: used directly.
        assert_eq!(track_direction(left, Vec2::default(), last), left);
        assert_eq!(track_direction(Vec2::default(), right, last), right);
        // No edges: previous estimate.
        assert_eq!(track_direction(Vec2::default(), Vec2::default(), last), last);
    }

    #[test]
    fn fan_sees_further_on_an_open_frame() {
        let mut open = Frame::new_boxed();
        let mut queue = DrawQueue::disabled();
        let far = ray_fan(
            &mut open,
            Point::new(320, 400),
            STRAIGHT_AHEAD,
            &mut queue,
        );

        let mut blocked = Frame::new_boxed();
        for y in 360..370u16 {
            for x in 0..WIDTH as u16 {
                blocked.set(Point::new(x, y), EDGE);
            }
        }
        let near = ray_fan(
            &mut blocked,
            Point::new(320, 400),
            STRAIGHT_AHEAD,
            &mut queue,
        );
        assert!(far > near * 3, "open {far} vs blocked {near}");
        assert!(near >= 30 && near <= 45, "blocked fan length {near}");
    }

    #[test]
    fn probes_measure_each_axis_independently() {
        let mut frame = Frame::new_boxed();
        // A wall close on the left only.
        for y in 0..HEIGHT as u16 {
            frame.set(Point::new(280, y), EDGE);
        }
        let mut queue = DrawQueue::disabled();
        let probes = finish_probes(&mut frame, Point::new(320, 400), &mut queue);
        assert!(probes.horiz_left <= 41);
        assert!(probes.horiz_right > 300);
        assert!(probes.straight > 300);
        assert!(probes.diag_left <= 60);
        assert!(probes.diag_right > 70);
    }
}
