//! Path stitching: expand a stop order into continuous road geometry.

use crate::error::{PlanError, Result};
use crate::graph::{Graph, Point};
use crate::matrix::DistanceMatrix;
use serde::{Deserialize, Serialize};

/// Default distance under which two consecutive points are merged.
pub const DEFAULT_EPSILON: f64 = 0.01;

/// Concrete route geometry plus the tour's matrix cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchedPath {
    pub points: Vec<Point>,
    pub cost: f64,
}

/// Concatenate the edge polylines along every stop-to-stop hop of `tour`.
///
/// Polylines traversed from `b` to `a` are reversed. A segment whose first
/// point lies within `epsilon` of the previous segment's last point is
/// joined without repeating it. A hop without a cached path, or a node pair
/// without a connecting edge, is a `GraphInconsistency`.
pub fn stitch(graph: &Graph, tour: &[usize], matrix: &DistanceMatrix, epsilon: f64) -> Result<StitchedPath> {
    let mut points: Vec<Point> = Vec::new();

    if let Some(&first) = tour.first() {
        let node = matrix.stops[first];
        let start = graph
            .position(node)
            .ok_or_else(|| PlanError::inconsistency(format!("start node {} is not in the graph", node)))?;
        points.push(start);
    }

    for hop in tour.windows(2) {
        let (i, j) = (hop[0], hop[1]);
        let path = matrix.path(i, j).ok_or_else(|| {
            PlanError::inconsistency(format!(
                "no cached path from node {} to node {}",
                matrix.stops[i], matrix.stops[j]
            ))
        })?;

        for step in path.windows(2) {
            let (u, v) = (step[0], step[1]);
            let edge = graph.edge_between(u, v).ok_or_else(|| {
                PlanError::inconsistency(format!("no edge between nodes {} and {}", u, v))
            })?;
            append_segment(&mut points, &edge.polyline_from(u), epsilon);
        }
    }

    Ok(StitchedPath {
        points,
        cost: matrix.tour_cost(tour),
    })
}

fn append_segment(points: &mut Vec<Point>, segment: &[Point], epsilon: f64) {
    let mut rest = segment;
    if let (Some(last), Some(first)) = (points.last(), segment.first()) {
        if last.distance(first) < epsilon {
            rest = &segment[1..];
        }
    }
    points.extend_from_slice(rest);
}
