//! Configuration loading and parsing.
//!
//! Parses `pland.toml` (or an override path provided by the binary). Every
//! empirical constant of the planner and the segmentation stage lives here
//! with its field-tested default, so tuning a track setup never needs a
//! rebuild. Unknown fields are ignored (TOML deserialization tolerance) to
//! allow forward evolution without immediate warnings. Values that depend
//! on the frame geometry are clamped in `Config::apply_frame_bounds`; the
//! raw parsed values are retained so a different geometry can re-clamp.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

/// Planner tuning. Defaults mirror the reference track setup.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlannerConfig {
    /// Frame row of the bottom track-center scan.
    #[serde(default = "PlannerConfig::default_scan_row")]
    pub scan_row: u16,
    /// How far above the scan row the "known black" anchor point sits.
    #[serde(default = "PlannerConfig::default_center_offset")]
    pub center_offset: u16,
    /// Vertical step of the upward centerline walk, in rows.
    #[serde(default = "PlannerConfig::default_centerline_step")]
    pub centerline_step: u16,
    /// Upper bound on centerline points per frame.
    #[serde(default = "PlannerConfig::default_max_centers")]
    pub max_centers: u16,
    /// Expected track width in pixels; edge searches give up at half this.
    #[serde(default = "PlannerConfig::default_track_width")]
    pub track_width: u16,
    /// Gain applied when rescaling the midline offset to [-1, 1].
    #[serde(default = "PlannerConfig::default_steer_gain")]
    pub steer_gain: f32,
}

impl PlannerConfig {
    // The reference tuning was measured on a 240-row frame (scan row 210,
    // horizon 211); both scale by two on this 480-row geometry.
    const fn default_scan_row() -> u16 {
        420
    }
    const fn default_center_offset() -> u16 {
        10
    }
    const fn default_centerline_step() -> u16 {
        8
    }
    const fn default_max_centers() -> u16 {
        192
    }
    const fn default_track_width() -> u16 {
        300
    }
    const fn default_steer_gain() -> f32 {
        4.0
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            scan_row: Self::default_scan_row(),
            center_offset: Self::default_center_offset(),
            centerline_step: Self::default_centerline_step(),
            max_centers: Self::default_max_centers(),
            track_width: Self::default_track_width(),
            steer_gain: Self::default_steer_gain(),
        }
    }
}

/// Segmentation thresholds and the margin pre-fill.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SegmentConfig {
    /// Intensity delta above which a pixel is declared an edge.
    #[serde(default = "SegmentConfig::default_threshold")]
    pub threshold: u8,
    /// Look-ahead distance of the delta comparison, in pixels.
    #[serde(default = "SegmentConfig::default_look_ahead")]
    pub look_ahead: u8,
    /// Width of the force-filled dead zone at the frame margins.
    #[serde(default = "SegmentConfig::default_deadzone")]
    pub deadzone: u16,
    /// Base intensity of the adaptive floor fill.
    #[serde(default = "SegmentConfig::default_floor_color")]
    pub floor_color: u8,
    /// First row below the driving horizon; everything from here down is
    /// floor-filled before thresholding.
    #[serde(default = "SegmentConfig::default_horizon_row")]
    pub horizon_row: u16,
}

impl SegmentConfig {
    const fn default_threshold() -> u8 {
        60
    }
    const fn default_look_ahead() -> u8 {
        6
    }
    const fn default_deadzone() -> u16 {
        6
    }
    const fn default_floor_color() -> u8 {
        90
    }
    const fn default_horizon_row() -> u16 {
        422
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            look_ahead: Self::default_look_ahead(),
            deadzone: Self::default_deadzone(),
            floor_color: Self::default_floor_color(),
            horizon_row: Self::default_horizon_row(),
        }
    }
}

/// Finish-line detector thresholds, all in look-ahead pixels except the
/// slope, which is pixels per frame.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FinishConfig {
    #[serde(default = "FinishConfig::default_min_slope")]
    pub min_slope: f32,
    /// Both oblique rays must see at least this far.
    #[serde(default = "FinishConfig::default_oblique_min")]
    pub oblique_min: u16,
    /// Both horizontal rays must see at most this far.
    #[serde(default = "FinishConfig::default_horizontal_max")]
    pub horizontal_max: u16,
    /// The straight-ahead ray must see at least this far.
    #[serde(default = "FinishConfig::default_straight_min")]
    pub straight_min: u16,
    /// Shortcut: both diagonals below this while straight is long.
    #[serde(default = "FinishConfig::default_diagonal_shortcut_max")]
    pub diagonal_shortcut_max: u16,
}

impl FinishConfig {
    const fn default_min_slope() -> f32 {
        8.0
    }
    const fn default_oblique_min() -> u16 {
        120
    }
    const fn default_horizontal_max() -> u16 {
        60
    }
    const fn default_straight_min() -> u16 {
        160
    }
    const fn default_diagonal_shortcut_max() -> u16 {
        25
    }
}

impl Default for FinishConfig {
    fn default() -> Self {
        Self {
            min_slope: Self::default_min_slope(),
            oblique_min: Self::default_oblique_min(),
            horizontal_max: Self::default_horizontal_max(),
            straight_min: Self::default_straight_min(),
            diagonal_shortcut_max: Self::default_diagonal_shortcut_max(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct DrawConfig {
    /// Enable the debug overlay queues even outside `--proc-test`.
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub finish: FinishConfig,
    #[serde(default)]
    pub draw: DrawConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("pland.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("pland").join("pland.toml");
    }
    // Final fallback relative filename.
    PathBuf::from("pland.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(Config {
                    raw: Some(content),
                    file,
                })
            }
            Err(e) => {
                // A malformed file falls back to defaults rather than
                // aborting the daemon; the log line is the only trace.
                tracing::warn!(target: "config", path = %path.display(), %e, "config_parse_failed_using_defaults");
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Clamp geometry-dependent values to the frame bounds, logging every
    /// adjustment. Returns the clamped planner section.
    pub fn apply_frame_bounds(&mut self, width: u16, height: u16) -> PlannerConfig {
        let planner = &mut self.file.planner;
        let clamp_log = |name: &str, raw: u16, clamped: u16| {
            if raw != clamped {
                info!(target: "config", field = name, raw, clamped, "value_clamped_to_frame");
            }
        };

        let scan_row = planner.scan_row.min(height - 1);
        clamp_log("planner.scan_row", planner.scan_row, scan_row);
        planner.scan_row = scan_row;

        let center_offset = planner.center_offset.min(planner.scan_row);
        clamp_log("planner.center_offset", planner.center_offset, center_offset);
        planner.center_offset = center_offset;

        let track_width = planner.track_width.min(width);
        clamp_log("planner.track_width", planner.track_width, track_width);
        planner.track_width = track_width;

        let step = planner.centerline_step.max(1);
        clamp_log("planner.centerline_step", planner.centerline_step, step);
        planner.centerline_step = step;

        let segment = &mut self.file.segment;
        let horizon = segment.horizon_row.min(height);
        clamp_log("segment.horizon_row", segment.horizon_row, horizon);
        segment.horizon_row = horizon;

        let deadzone = segment.deadzone.min(width / 4);
        clamp_log("segment.deadzone", segment.deadzone, deadzone);
        segment.deadzone = deadzone;

        self.file.planner.clone()
    }
}
