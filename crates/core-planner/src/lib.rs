//! The per-frame planner: consumes a segmented frame, produces a plan.
//!
//! One call to [`Planner::step`] runs the whole geometric pipeline
//! (bottom-row center, upward centerline, edge localization and tracing,
//! midline, direction estimate, look-ahead fans) and folds the result
//! into a steering position in [-1, 1] and a speed in [0, 1]. The planner
//! owns all cross-frame state (median history, direction memory, speed
//! window, finish latch); nothing lives in globals.

pub mod center;
pub mod edges;
pub mod finish;
pub mod lookahead;
pub mod speed;

use center::{CenterTracker, centerline};
use core_config::{FinishConfig, PlannerConfig};
use core_draw::DrawQueue;
use core_frame::{Frame, WIDTH};
use core_geom::{Point, Vec2};
use core_shmem::{PlanRegion, ShmemError};
use edges::analyze_edges;
use finish::FinishDetector;
use lookahead::{STRAIGHT_AHEAD, finish_probes, ray_fan, track_direction};
use speed::SpeedShaper;
use tracing::{debug, trace};

/// One frame's driving hints, plus the diagnostics the tests and the
/// overlay want.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    /// Lateral target in [-1, 1]; negative steers left.
    pub target_pos: f32,
    /// Speed target in [0, 1].
    pub target_speed: f32,
    /// Latched finish-line flag.
    pub lap_of_honor: bool,
    /// Mean fan distance this frame, in pixels.
    pub look_ahead: u16,
    /// How many midline points the edge traces produced.
    pub midline_points: usize,
}

/// Planner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    /// No track fix yet.
    Searching,
    /// Normal lane following.
    Following,
    /// Finish line seen; terminal for the process lifetime.
    FinishLatched,
}

/// Where finished plans go. The production sink is the `PLAN` shared
/// memory region; tests substitute an in-memory recorder.
pub trait PlanSink {
    fn publish_plan(&self, plan: &Plan) -> Result<u32, ShmemError>;
}

impl PlanSink for PlanRegion {
    fn publish_plan(&self, plan: &Plan) -> Result<u32, ShmemError> {
        self.publish(plan.target_pos, plan.target_speed, plan.lap_of_honor)
    }
}

pub struct Planner {
    cfg: PlannerConfig,
    center: CenterTracker,
    speed: SpeedShaper,
    finish: FinishDetector,
    dir_last: Vec2,
    state: PlannerState,
}

impl Planner {
    pub fn new(cfg: PlannerConfig, finish_cfg: FinishConfig) -> Self {
        Self {
            cfg,
            center: CenterTracker::new(),
            speed: SpeedShaper::new(),
            finish: FinishDetector::new(finish_cfg),
            dir_last: STRAIGHT_AHEAD,
            state: PlannerState::Searching,
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Run the planner over one segmented frame. The frame is mutable for
    /// the tracing visitors; overlay shapes go to `queue` and are drained
    /// by the caller after this returns.
    pub fn step(&mut self, frame: &mut Frame, queue: &mut DrawQueue) -> Plan {
        let cfg = self.cfg.clone();

        let bottom = self.center.bottom_center(frame, cfg.scan_row, queue);
        let center_black = Point::new(bottom.x, bottom.y.saturating_sub(cfg.center_offset));
        queue.push_square(center_black, 10, 150);

        let centers = centerline(
            frame,
            center_black,
            cfg.centerline_step,
            cfg.max_centers,
            queue,
        );
        let analysis = analyze_edges(frame, center_black, cfg.track_width, queue);

        let dir = track_direction(analysis.left_dir, analysis.right_dir, self.dir_last);
        self.dir_last = dir;

        let look_ahead = ray_fan(frame, center_black, dir, queue);
        let probes = finish_probes(frame, center_black, queue);

        let edge_fix = !analysis.left_dir.is_zero() || !analysis.right_dir.is_zero();
        if self.state == PlannerState::Searching && edge_fix {
            debug!(target: "planner", "first track fix, following");
            self.state = PlannerState::Following;
        }
        let armed = self.state != PlannerState::Searching;
        if self.finish.update(&probes, armed) && self.state != PlannerState::FinishLatched {
            self.state = PlannerState::FinishLatched;
        }

        let target_pos = self.target_pos(&analysis.midpoints, &centers);
        let target_speed = self.speed.speed_for(look_ahead);

        trace!(
            target: "planner",
            target_pos,
            target_speed,
            look_ahead,
            midline_points = analysis.midpoints.len(),
            state = ?self.state,
            "plan computed"
        );

        Plan {
            target_pos,
            target_speed,
            lap_of_honor: self.state == PlannerState::FinishLatched,
            look_ahead,
            midline_points: analysis.midpoints.len(),
        }
    }

    /// Rescale the mean midline x from [0, W] to [-1, 1], apply the
    /// steering gain and saturate. Falls back from the traced midline to
    /// the centerline walk when no midpoints were produced.
    fn target_pos(&self, midpoints: &[Point], centers: &[Point]) -> f32 {
        let source: &[Point] = if !midpoints.is_empty() {
            midpoints
        } else {
            centers
        };
        if source.is_empty() {
            return 0.0;
        }
        let sum: u32 = source.iter().map(|p| p.x as u32).sum();
        // Pixel coordinates go to float before the division; the integer
        // form would round the whole expression to a constant.
        let mean_x = sum as f32 / source.len() as f32;
        let offset = mean_x / (WIDTH as f32 / 2.0) - 1.0;
        (offset * self.cfg.steer_gain).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_frame::{EDGE, HEIGHT, TRACK};

    fn planner() -> Planner {
        Planner::new(test_cfg(), FinishConfig::default())
    }

    fn test_cfg() -> PlannerConfig {
        PlannerConfig {
            scan_row: 420,
            ..PlannerConfig::default()
        }
    }

    /// Walled corridor centered on `center_x`, `width` px wide.
    fn corridor(center_x: u16, width: u16) -> Box<Frame> {
        let mut frame = Frame::new_boxed();
        frame.fill(TRACK);
        let left = center_x - width / 2;
        let right = center_x + width / 2;
        for y in 0..HEIGHT as u16 {
            frame.set(Point::new(left, y), EDGE);
            frame.set(Point::new(left - 1, y), EDGE);
            frame.set(Point::new(right, y), EDGE);
            frame.set(Point::new(right + 1, y), EDGE);
        }
        frame
    }

    #[test]
    fn searching_becomes_following_on_first_fix() {
        let mut planner = planner();
        assert_eq!(planner.state(), PlannerState::Searching);
        let mut frame = corridor(320, 240);
        let mut queue = DrawQueue::disabled();
        planner.step(&mut frame, &mut queue);
        assert_eq!(planner.state(), PlannerState::Following);
    }

    #[test]
    fn all_black_frame_keeps_searching_but_plans() {
        let mut planner = planner();
        let mut frame = Frame::new_boxed();
        let mut queue = DrawQueue::disabled();
        let plan = planner.step(&mut frame, &mut queue);
        assert_eq!(planner.state(), PlannerState::Searching);
        assert!(!plan.lap_of_honor);
        assert!(plan.target_pos.abs() <= 0.1, "pos {}", plan.target_pos);
    }

    #[test]
    fn plan_outputs_are_always_saturated() {
        let mut planner = planner();
        let mut queue = DrawQueue::disabled();
        // A pathological frame: everything white.
        let mut frame = Frame::new_boxed();
        frame.fill(EDGE);
        for _ in 0..3 {
            let plan = planner.step(&mut frame, &mut queue);
            assert!((-1.0..=1.0).contains(&plan.target_pos));
            assert!((0.0..=1.0).contains(&plan.target_speed));
        }
    }

    #[test]
    fn centered_corridor_steers_straight() {
        let mut planner = planner();
        let mut queue = DrawQueue::disabled();
        let mut plan = None;
        for _ in 0..speed::SPEED_WINDOW + 1 {
            let mut frame = corridor(320, 240);
            plan = Some(planner.step(&mut frame, &mut queue));
        }
        let plan = plan.unwrap();
        assert!(plan.target_pos.abs() <= 0.06, "pos {}", plan.target_pos);
        assert!(plan.midline_points > 0);
    }

    #[test]
    fn direction_memory_survives_a_blank_frame() {
        let mut planner = planner();
        let mut queue = DrawQueue::disabled();
        let mut frame = corridor(320, 240);
        planner.step(&mut frame, &mut queue);
        let dir_after_fix = planner.dir_last;
        // Tunnel frame: no edges anywhere.
        let mut blank = Frame::new_boxed();
        planner.step(&mut blank, &mut queue);
        assert_eq!(planner.dir_last, dir_after_fix);
    }
}
