//! Look-ahead smoothing and the speed mapping.

use core_ring::Ring;

/// Width of the look-ahead moving-average window, in frames.
pub const SPEED_WINDOW: usize = 4;

/// Distance (pixels) at or below which the car crawls.
const CRAWL_KNEE: f32 = 20.0;
/// Distance at which the cautious segment hands over to the fast one.
const CORNER_KNEE: f32 = 60.0;
/// Distance at which full speed is reached.
const FULL_KNEE: f32 = 180.0;
/// Speed at the corner knee.
const CORNER_SPEED: f32 = 0.3;
/// Floor of the speed command; the controller treats this as "rolling".
const MIN_SPEED: f32 = 0.05;

/// Piecewise-linear monotone mapping from a look-ahead distance to a
/// speed in [0.05, 1]. Shallow below the corner knee, steep above it.
pub fn corner_response(distance: f32) -> f32 {
    let speed = if distance <= CRAWL_KNEE {
        MIN_SPEED
    } else if distance <= CORNER_KNEE {
        MIN_SPEED + (distance - CRAWL_KNEE) / (CORNER_KNEE - CRAWL_KNEE) * (CORNER_SPEED - MIN_SPEED)
    } else {
        CORNER_SPEED + (distance - CORNER_KNEE) / (FULL_KNEE - CORNER_KNEE) * (1.0 - CORNER_SPEED)
    };
    speed.clamp(MIN_SPEED, 1.0)
}

/// Windowed speed shaping: the raw per-frame look-ahead goes through a
/// short moving average before the corner response, so one noisy frame
/// cannot slam the throttle.
#[derive(Debug, Default)]
pub struct SpeedShaper {
    window: Ring<u16, SPEED_WINDOW>,
}

impl SpeedShaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed_for(&mut self, look_ahead: u16) -> f32 {
        self.window.push(look_ahead);
        let sum: u32 = self.window.as_slice().iter().map(|&d| d as u32).sum();
        let mean = sum as f32 / SPEED_WINDOW as f32;
        corner_response(mean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_monotone_and_clamped() {
        let mut last = 0.0;
        for d in 0..500u16 {
            let s = corner_response(d as f32);
            assert!(s >= last, "response decreased at {d}");
            assert!((MIN_SPEED..=1.0).contains(&s));
            last = s;
        }
        assert_eq!(corner_response(0.0), MIN_SPEED);
        assert_eq!(corner_response(400.0), 1.0);
    }

    #[test]
    fn long_view_maps_fast() {
        assert!(corner_response(170.0) >= 0.8);
    }

    #[test]
    fn window_damps_a_single_spike() {
        let mut shaper = SpeedShaper::new();
        for _ in 0..SPEED_WINDOW {
            shaper.speed_for(30);
        }
        let steady = shaper.speed_for(30);
        let spiked = shaper.speed_for(400);
        assert!(spiked > steady);
        // One 400 px frame in a 30 px window averages to ~122, far from
        // full speed.
        assert!(spiked < 0.8);
    }

    #[test]
    fn window_converges_after_filling() {
        let mut shaper = SpeedShaper::new();
        let mut last = 0.0;
        for _ in 0..SPEED_WINDOW + 1 {
            last = shaper.speed_for(200);
        }
        assert_eq!(last, 1.0);
    }
}
