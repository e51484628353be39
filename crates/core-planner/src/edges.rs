//! Track-edge localization, radial edge tracing, and the midline.

use core_draw::DrawQueue;
use core_frame::{
    EDGE, Frame, NoDrawStopWhite, SweepDirection, SweepStatus, WIDTH, radial_sweep, raycast,
    sweep::direction_of_fraction, sweep_fraction_of,
};
use core_geom::{Line, Point, Vec2};
use tracing::trace;

/// Contour points traced per edge per frame.
const EDGE_TRACE_STEPS: usize = 20;

/// Scan along `row` from the center outward until the first edge pixel.
/// Gives up once the scanned distance exceeds half the track width; the
/// result is clipped at the frame bounds and may still sit on track if
/// the edge is genuinely out of reach.
pub fn find_edge(frame: &Frame, center_black: Point, side: Side, track_width: u16) -> Point {
    let delta: i32 = match side {
        Side::Left => -1,
        Side::Right => 1,
    };
    let limit = (track_width / 2) as i32;
    let mut x = center_black.x as i32;
    let mut travelled = 0;
    while x > 0 && x < WIDTH as i32 - 1 && travelled < limit {
        if frame.get(Point::new(x as u16, center_black.y)) == Some(EDGE) {
            break;
        }
        x += delta;
        travelled += 1;
    }
    Point::new(x as u16, center_black.y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn sweep_direction(self) -> SweepDirection {
        match self {
            // The left edge is followed counter-clockwise, the right edge
            // clockwise; both walk up-track that way.
            Side::Left => SweepDirection::CounterClockwise,
            Side::Right => SweepDirection::Clockwise,
        }
    }

    /// Where on the circle the first sweep starts: pointing across the
    /// track, so the first hit lands on the own edge contour.
    fn initial_fraction(self) -> f32 {
        match self {
            Side::Left => 0.25,
            Side::Right => 0.75,
        }
    }

    /// Re-seed offset after a confirmed step, mirroring the sweep's
    /// internal quarter-turn reset.
    fn reseed_offset(self) -> f32 {
        match self {
            Side::Left => 0.25,
            Side::Right => 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeState {
    Tracing,
    /// Drifted too far from the centerline.
    Diverged,
    /// The sweep reported boundary or exhaustion.
    Ended,
}

#[derive(Debug)]
struct EdgeTrace {
    side: Side,
    start: Point,
    pos: Point,
    sweep_frac: f32,
    state: EdgeState,
}

impl EdgeTrace {
    fn new(frame: &Frame, start: Point, side: Side) -> Self {
        // An edge can only be traced if localization actually landed on a
        // white pixel.
        let state = if frame.get(start) == Some(EDGE) {
            EdgeState::Tracing
        } else {
            EdgeState::Ended
        };
        Self {
            side,
            start,
            pos: start,
            sweep_frac: side.initial_fraction(),
            state,
        }
    }

    fn alive(&self) -> bool {
        self.state == EdgeState::Tracing
    }

    fn advance(&mut self, frame: &Frame, center_x: u16, track_width: u16, queue: &mut DrawQueue) {
        if !self.alive() {
            return;
        }
        let outcome = radial_sweep(
            frame,
            self.pos,
            1,
            self.side.sweep_direction(),
            self.sweep_frac,
            1.0,
            queue,
        );
        match outcome.status {
            SweepStatus::Ok => {
                let step = self.pos.dir_to(outcome.point);
                self.pos = outcome.point;
                self.sweep_frac =
                    (sweep_fraction_of(step) + self.side.reseed_offset()).rem_euclid(1.0);
                let drift = (self.pos.x as i32 - center_x as i32).unsigned_abs();
                if drift > (track_width as u32 * 7) / 10 {
                    self.state = EdgeState::Diverged;
                }
            }
            status => {
                trace!(target: "planner.edges", side = ?self.side, ?status, "edge trace ended");
                self.state = EdgeState::Ended;
            }
        }
    }

    /// Net direction of the traced contour; zero means the edge was
    /// missing or never moved.
    fn direction(&self) -> Vec2 {
        self.start.dir_to(self.pos)
    }
}

/// Everything the rest of the planner needs to know about the two edges.
#[derive(Debug)]
pub struct EdgeAnalysis {
    pub left: Point,
    pub right: Point,
    /// Net contour directions; a zero vector marks a missing edge.
    pub left_dir: Vec2,
    pub right_dir: Vec2,
    pub midpoints: Vec<Point>,
}

/// Localize both edges on the center row, trace them independently, and
/// build the midline as the traces progress.
pub fn analyze_edges(
    frame: &mut Frame,
    center_black: Point,
    track_width: u16,
    queue: &mut DrawQueue,
) -> EdgeAnalysis {
    let left = find_edge(frame, center_black, Side::Left, track_width);
    let right = find_edge(frame, center_black, Side::Right, track_width);
    queue.push_square(left, 6, 64);
    queue.push_square(right, 6, 64);

    let mut left_trace = EdgeTrace::new(frame, left, Side::Left);
    let mut right_trace = EdgeTrace::new(frame, right, Side::Right);
    let mut midpoints = Vec::with_capacity(EDGE_TRACE_STEPS);

    for _ in 0..EDGE_TRACE_STEPS {
        left_trace.advance(frame, center_black.x, track_width, queue);
        right_trace.advance(frame, center_black.x, track_width, queue);

        match (left_trace.alive(), right_trace.alive()) {
            (true, true) => {
                let mid = Point::new(
                    (left_trace.pos.x + right_trace.pos.x) / 2,
                    (left_trace.pos.y + right_trace.pos.y) / 2,
                );
                queue.push_pixel(mid, 180);
                midpoints.push(mid);
            }
            (true, false) => {
                if let Some(mid) = half_track_midpoint(frame, &left_trace, track_width) {
                    queue.push_pixel(mid, 180);
                    midpoints.push(mid);
                }
            }
            (false, true) => {
                if let Some(mid) = half_track_midpoint(frame, &right_trace, track_width) {
                    queue.push_pixel(mid, 180);
                    midpoints.push(mid);
                }
            }
            (false, false) => break,
        }
    }

    EdgeAnalysis {
        left,
        right,
        left_dir: left_trace.direction(),
        right_dir: right_trace.direction(),
        midpoints,
    }
}

/// Midline estimate from a single surviving edge: cast across the track
/// along the current sweep-start direction (which points at the interior)
/// and take the halfway point of the hit.
fn half_track_midpoint(frame: &mut Frame, trace: &EdgeTrace, track_width: u16) -> Option<Point> {
    let across = Line {
        orig: trace.pos,
        dir: direction_of_fraction(trace.sweep_frac),
    };
    let hit_len = raycast(frame, across.orig, across.dir, &mut NoDrawStopWhite);
    if hit_len == 0 {
        return None;
    }
    let half = (hit_len.min(track_width / 2) / 2) as f32;
    let step = across.dir.normalized_to(half)?;
    Some(across.orig.offset(step))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_frame::{HEIGHT, TRACK};

    /// Corridor with white walls at x0-1 and x1, track in between.
    fn walled_corridor(x0: u16, x1: u16) -> Box<Frame> {
        let mut frame = Frame::new_boxed();
        frame.fill(TRACK);
        for y in 0..HEIGHT as u16 {
            frame.set(Point::new(x0 - 1, y), EDGE);
            frame.set(Point::new(x1, y), EDGE);
        }
        frame
    }

    #[test]
    fn finds_both_walls() {
        let frame = walled_corridor(200, 440);
        let center = Point::new(320, 300);
        let left = find_edge(&frame, center, Side::Left, 300);
        let right = find_edge(&frame, center, Side::Right, 300);
        assert_eq!(left, Point::new(199, 300));
        assert_eq!(right, Point::new(440, 300));
    }

    #[test]
    fn edge_search_gives_up_at_half_track_width() {
        let frame = walled_corridor(100, 540);
        let center = Point::new(320, 300);
        let left = find_edge(&frame, center, Side::Left, 300);
        // The wall at 99 is 221 px away, beyond the 150 px search limit.
        assert_eq!(left.x, 320 - 150);
        assert_eq!(frame.get(left), Some(TRACK));
    }

    #[test]
    fn straight_corridor_midline_stays_centered() {
        let mut frame = walled_corridor(220, 420);
        let center = Point::new(320, 300);
        let mut queue = DrawQueue::disabled();
        let analysis = analyze_edges(&mut frame, center, 300, &mut queue);
        assert!(
            analysis.midpoints.len() >= EDGE_TRACE_STEPS / 2,
            "expected a usable midline, got {} points",
            analysis.midpoints.len()
        );
        for mid in &analysis.midpoints {
            assert!(
                (mid.x as i32 - 320).abs() <= 8,
                "midline drifted to {mid}"
            );
        }
        // Both contours head up-track.
        assert!(analysis.left_dir.y < 0);
        assert!(analysis.right_dir.y < 0);
    }

    #[test]
    fn missing_edges_produce_zero_directions() {
        let mut frame = Frame::new_boxed();
        let mut queue = DrawQueue::disabled();
        let analysis = analyze_edges(&mut frame, Point::new(320, 300), 300, &mut queue);
        assert!(analysis.left_dir.is_zero());
        assert!(analysis.right_dir.is_zero());
        assert!(analysis.midpoints.is_empty());
    }

    #[test]
    fn diverging_edge_is_cut_off() {
        // Left wall swerves hard left; the trace must stop once it drifts
        // more than 0.7 * track_width from the center.
        let mut frame = Frame::new_boxed();
        frame.fill(TRACK);
        for y in 0..=300u16 {
            let x = 250u16.saturating_sub((300 - y).saturating_mul(2)).max(1);
            frame.set(Point::new(x, y), EDGE);
            frame.set(Point::new(x.saturating_sub(1), y), EDGE);
        }
        let mut queue = DrawQueue::disabled();
        let analysis = analyze_edges(&mut frame, Point::new(320, 300), 150, &mut queue);
        // 0.7 * 150 = 105 px of drift allowed.
        assert!(analysis.left_dir.x.abs() < 150);
    }
}
