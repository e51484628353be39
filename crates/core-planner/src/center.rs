//! Bottom-row track-center scan and the upward centerline walk.

use core_draw::DrawQueue;
use core_frame::{Frame, HEIGHT, NoDrawStopWhite, TRACK, WIDTH, raycast};
use core_geom::{Point, Vec2, median_u16};
use core_ring::Ring;

/// Entries in the bottom-center median filter.
pub const CENTER_HISTORY: usize = 4;

/// A run of track pixels on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: u16,
    len: u16,
}

impl Run {
    fn mid(self) -> u16 {
        self.start + self.len / 2
    }
}

/// Longest contiguous run of black pixels on `row`. Returns `None` when
/// the row holds no track at all.
fn longest_black_run(row: &[u8; WIDTH]) -> Option<Run> {
    let mut best: Option<Run> = None;
    let mut current: Option<Run> = None;
    for (x, &pixel) in row.iter().enumerate() {
        if pixel == TRACK {
            match &mut current {
                Some(run) => run.len += 1,
                None => {
                    current = Some(Run {
                        start: x as u16,
                        len: 1,
                    })
                }
            }
        } else if let Some(run) = current.take()
            && best.is_none_or(|b| run.len > b.len)
        {
            best = Some(run);
        }
    }
    if let Some(run) = current
        && best.is_none_or(|b| run.len > b.len)
    {
        best = Some(run);
    }
    best
}

/// Run of black pixels containing `anchor`, if the anchor sits on track;
/// otherwise the longest run on the row.
fn run_near_anchor(row: &[u8; WIDTH], anchor: u16) -> Option<Run> {
    if row[(anchor as usize).min(WIDTH - 1)] == TRACK {
        // Expand outward from the anchor.
        let mut start = anchor;
        while start > 0 && row[start as usize - 1] == TRACK {
            start -= 1;
        }
        let mut end = anchor;
        while (end as usize) < WIDTH - 1 && row[end as usize + 1] == TRACK {
            end += 1;
        }
        return Some(Run {
            start,
            len: end - start + 1,
        });
    }
    longest_black_run(row)
}

/// Median-filtered bottom-row center. Owned by the planner so the history
/// survives across frames.
#[derive(Debug, Default)]
pub struct CenterTracker {
    history: Ring<u16, CENTER_HISTORY>,
}

impl CenterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the track center on `scan_row`. The raw midpoint of the
    /// longest black run goes through the median history; an empty run
    /// (center 0) falls back to the frame middle.
    pub fn bottom_center(&mut self, frame: &Frame, scan_row: u16, queue: &mut DrawQueue) -> Point {
        let raw = longest_black_run(frame.row(scan_row as usize))
            .map(Run::mid)
            .unwrap_or(0);
        self.history.push(raw);
        let filtered = median_u16(self.history.as_slice());
        let center = if filtered == 0 {
            // Never report a center on the left border.
            Point::new(WIDTH as u16 / 2, scan_row)
        } else {
            Point::new(filtered, scan_row)
        };
        queue.push_square(center, 10, 150);
        center
    }
}

/// Upward centerline walk: starting from the bottom center, re-scan every
/// `step` rows using the previous center as the anchor, for at most
/// `max_centers` points. Stops early when the row has no track, or when an
/// upward raycast from the last accepted center dies within `4 * step`
/// rows (the car is staring at a wall).
pub fn centerline(
    frame: &mut Frame,
    bottom: Point,
    step: u16,
    max_centers: u16,
    queue: &mut DrawQueue,
) -> Vec<Point> {
    let mut points = vec![bottom];
    let mut anchor = bottom.x;
    let mut y = bottom.y;
    let height_limit = (4 * step) as u16;

    for _ in 1..max_centers {
        let Some(next_y) = y.checked_sub(step) else {
            break;
        };
        if next_y == 0 || next_y as usize >= HEIGHT {
            break;
        }

        let last = *points.last().unwrap_or(&bottom);
        let clearance = raycast(frame, last, Vec2::new(0, -1), &mut NoDrawStopWhite);
        if clearance < height_limit {
            break;
        }

        let Some(run) = run_near_anchor(frame.row(next_y as usize), anchor) else {
            break;
        };
        let center = Point::new(run.mid(), next_y);
        queue.push_pixel(center, 150);
        points.push(center);
        anchor = center.x;
        y = next_y;
    }
    points
}
