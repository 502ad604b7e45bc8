//! Arc-length parameterization of stitched paths.
//!
//! The renderer asks for "position and heading after travelling `d` units"
//! once per frame; the cumulative table makes that a binary search.

use crate::graph::Point;
use serde::{Deserialize, Serialize};

/// Upper bound on the samples produced by [`Traversal::sample_distances`].
pub const MAX_SAMPLES: usize = 10_000;

/// Position and direction at some distance along a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub position: Point,
    /// Direction of travel in radians, `atan2(dy, dx)`.
    pub heading: f64,
}

/// Cumulative distances aligned index-for-index with a path's points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcLengthTable {
    pub cumulative: Vec<f64>,
}

impl ArcLengthTable {
    pub fn build(points: &[Point]) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += points[i - 1].distance(p);
            }
            cumulative.push(total);
        }
        ArcLengthTable { cumulative }
    }

    pub fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Index `i` of the segment `points[i]..points[i + 1]` containing `d`.
    fn segment_at(&self, d: f64) -> usize {
        let segments = self.cumulative.len().saturating_sub(1);
        // First point strictly beyond d, minus one, is the segment start.
        let upper = self.cumulative.partition_point(|&c| c <= d);
        upper.saturating_sub(1).min(segments.saturating_sub(1))
    }
}

fn segment_heading(points: &[Point], i: usize) -> Option<f64> {
    let (a, b) = (points.get(i)?, points.get(i + 1)?);
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if dx == 0.0 && dy == 0.0 {
        None
    } else {
        Some(dy.atan2(dx))
    }
}

/// Heading of segment `i`, borrowing from the nearest non-degenerate
/// segment before it (then after it) when `i` has zero length.
fn heading_near(points: &[Point], i: usize) -> f64 {
    let segments = points.len().saturating_sub(1);
    (0..=i)
        .rev()
        .find_map(|s| segment_heading(points, s))
        .or_else(|| (i + 1..segments).find_map(|s| segment_heading(points, s)))
        .unwrap_or(0.0)
}

/// Position and heading after travelling `d` along `points`.
///
/// `d` is clamped to `[0, total length]`; past the end the last point and
/// the last segment's heading are returned. `None` for an empty path or a
/// table that was not built from `points`.
pub fn sample_at_distance(points: &[Point], table: &ArcLengthTable, d: f64) -> Option<Sample> {
    let first = *points.first()?;
    if table.cumulative.len() != points.len() {
        return None;
    }
    if points.len() == 1 {
        return Some(Sample { position: first, heading: 0.0 });
    }

    let total = table.total_length();
    let d = if d.is_nan() { 0.0 } else { d.clamp(0.0, total) };

    if d >= total {
        let last = points.len() - 1;
        return Some(Sample {
            position: points[last],
            heading: heading_near(points, last - 1),
        });
    }

    let i = table.segment_at(d);
    let seg_start = table.cumulative[i];
    let seg_len = table.cumulative[i + 1] - seg_start;
    let t = if seg_len > 0.0 { (d - seg_start) / seg_len } else { 0.0 };

    Some(Sample {
        position: points[i].lerp(&points[i + 1], t),
        heading: heading_near(points, i),
    })
}

/// A path prepared for constant-speed playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Traversal {
    pub points: Vec<Point>,
    pub table: ArcLengthTable,
}

impl Traversal {
    pub fn new(points: Vec<Point>) -> Self {
        let table = ArcLengthTable::build(&points);
        Traversal { points, table }
    }

    pub fn total_length(&self) -> f64 {
        self.table.total_length()
    }

    pub fn sample(&self, d: f64) -> Option<Sample> {
        sample_at_distance(&self.points, &self.table, d)
    }

    /// Sample after `seconds` at `speed` units per second.
    pub fn at_time(&self, seconds: f64, speed: f64) -> Option<Sample> {
        self.sample(seconds * speed)
    }

    /// Distances `0, step, 2*step, ...` up to the path length.
    ///
    /// A non-positive or non-finite `step` yields ten samples. The step is
    /// widened so that at most `MAX_SAMPLES + 1` distances come back.
    pub fn sample_distances(&self, step: Option<f64>) -> Vec<f64> {
        let total = self.total_length();
        if total <= 0.0 {
            return vec![0.0];
        }
        let requested = step.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(total / 10.0);
        let step = requested.max(total / MAX_SAMPLES as f64);
        let count = ((total / step).floor() as usize).min(MAX_SAMPLES);
        (0..=count).map(|i| i as f64 * step).collect()
    }

    /// Seconds needed to cover the whole path at `speed`.
    pub fn duration(&self, speed: f64) -> f64 {
        if speed > 0.0 {
            self.total_length() / speed
        } else {
            f64::INFINITY
        }
    }
}
