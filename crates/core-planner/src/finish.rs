//! Finish-line detection with a process-lifetime latch.

use crate::lookahead::FinishProbes;
use core_config::FinishConfig;
use tracing::info;

/// Watches the probe distances for the finish-line signature. Once the
/// pattern is seen the detector latches until the next process start.
#[derive(Debug)]
pub struct FinishDetector {
    cfg: FinishConfig,
    latched: bool,
    last_straight: u16,
}

impl FinishDetector {
    pub fn new(cfg: FinishConfig) -> Self {
        Self {
            cfg,
            latched: false,
            last_straight: 0,
        }
    }

    pub fn latched(&self) -> bool {
        self.latched
    }

    /// Feed one frame's probes. `armed` is false while the planner is
    /// still searching for its first track fix; the slope history keeps
    /// updating but nothing can latch.
    pub fn update(&mut self, probes: &FinishProbes, armed: bool) -> bool {
        let slope = (probes.straight as f32 - self.last_straight as f32).abs();
        self.last_straight = probes.straight;
        if self.latched {
            return true;
        }
        if !armed {
            return false;
        }

        let cfg = &self.cfg;
        // The finish gate opens the view down the straight while walls
        // close in sideways: steep forward gradient, long diagonals,
        // short horizontals, long straight.
        let primary = slope >= cfg.min_slope
            && probes.diag_left >= cfg.oblique_min
            && probes.diag_right >= cfg.oblique_min
            && probes.horiz_left <= cfg.horizontal_max
            && probes.horiz_right <= cfg.horizontal_max
            && probes.straight >= cfg.straight_min;
        // Shortcut for the checkered pattern itself: both diagonals die
        // immediately while the straight still runs long.
        let shortcut = probes.diag_left <= cfg.diagonal_shortcut_max
            && probes.diag_right <= cfg.diagonal_shortcut_max
            && probes.straight >= cfg.straight_min;

        if primary || shortcut {
            info!(
                target: "planner.finish",
                straight = probes.straight,
                diag_left = probes.diag_left,
                diag_right = probes.diag_right,
                horiz_left = probes.horiz_left,
                horiz_right = probes.horiz_right,
                shortcut,
                "finish line latched"
            );
            self.latched = true;
        }
        self.latched
    }
}
