//! Reduced distance matrix over the stops of a planning run.
//!
//! Stop `0` is always the start. Row `i` comes from one Dijkstra run rooted
//! at stop `i`; the node-level path of every ordered pair is cached so the
//! stitcher never has to search the graph again.

use crate::error::{PlanError, Result};
use crate::graph::{Graph, NodeId};
use crate::shortest_path::shortest_paths;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrix {
    /// Graph node of each stop, start first.
    pub stops: Vec<NodeId>,
    pub distances: Vec<Vec<f64>>,
    /// Node path for each ordered stop pair `(i, j)`, `i != j`.
    #[serde(skip)]
    pub paths: HashMap<(usize, usize), Vec<NodeId>>,
}

impl DistanceMatrix {
    /// Build the matrix for `stops`, failing with `UnreachableStop` when any
    /// pair of stops is disconnected or a stop is not in the graph.
    pub fn build(graph: &Graph, stops: &[NodeId]) -> Result<Self> {
        for &stop in stops {
            if !graph.contains(stop) {
                return Err(PlanError::UnreachableStop {
                    from: stops.first().copied().unwrap_or(stop),
                    to: stop,
                });
            }
        }

        let matrix = Self::compute(graph, stops);
        matrix.ensure_reachable()?;
        Ok(matrix)
    }

    /// Build the matrix without rejecting unreachable pairs; those entries
    /// are `+inf` and have no cached path.
    pub fn compute(graph: &Graph, stops: &[NodeId]) -> Self {
        let k = stops.len();
        let mut distances = vec![vec![f64::INFINITY; k]; k];
        let mut paths = HashMap::new();

        for (i, &source) in stops.iter().enumerate() {
            let sp = shortest_paths(graph, source);
            for (j, &target) in stops.iter().enumerate() {
                if i == j {
                    distances[i][j] = if graph.contains(source) { 0.0 } else { f64::INFINITY };
                    continue;
                }
                distances[i][j] = sp.distance_to(target);
                if let Some(path) = sp.path_to(target) {
                    paths.insert((i, j), path);
                }
            }
            log::debug!("distance row {} (node {}) computed", i, source);
        }

        let mut matrix = DistanceMatrix { stops: stops.to_vec(), distances, paths };
        matrix.symmetrize();
        matrix
    }

    /// Matrix without geometry, for running solvers on raw distances.
    pub fn from_rows(distances: Vec<Vec<f64>>) -> Self {
        let stops = (0..distances.len()).collect();
        DistanceMatrix { stops, distances, paths: HashMap::new() }
    }

    /// Separate Dijkstra runs can sum the same path in a different order and
    /// disagree in the last bits; keep the smaller value and its path.
    fn symmetrize(&mut self) {
        let k = self.len();
        for i in 0..k {
            for j in i + 1..k {
                let (dij, dji) = (self.distances[i][j], self.distances[j][i]);
                if dij <= dji {
                    self.distances[j][i] = dij;
                    if let Some(path) = self.paths.get(&(i, j)) {
                        let reversed: Vec<NodeId> = path.iter().rev().copied().collect();
                        self.paths.insert((j, i), reversed);
                    }
                } else {
                    self.distances[i][j] = dji;
                    if let Some(path) = self.paths.get(&(j, i)) {
                        let reversed: Vec<NodeId> = path.iter().rev().copied().collect();
                        self.paths.insert((i, j), reversed);
                    }
                }
            }
        }
    }

    /// Fail on the first `+inf` entry, scanning row by row.
    pub fn ensure_reachable(&self) -> Result<()> {
        for (i, row) in self.distances.iter().enumerate() {
            for (j, d) in row.iter().enumerate() {
                if !d.is_finite() {
                    let (from, to) = if i == j { (self.stops[0], self.stops[i]) } else { (self.stops[i], self.stops[j]) };
                    return Err(PlanError::UnreachableStop { from, to });
                }
            }
        }
        Ok(())
    }

    /// Number of stops (K).
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances[i][j]
    }

    pub fn path(&self, i: usize, j: usize) -> Option<&[NodeId]> {
        self.paths.get(&(i, j)).map(Vec::as_slice)
    }

    /// Open-path cost of a tour: the sum of consecutive hops, no return leg.
    pub fn tour_cost(&self, tour: &[usize]) -> f64 {
        tour.windows(2).map(|w| self.distance(w[0], w[1])).sum()
    }

    /// Mean of the off-diagonal entries; zero for fewer than two stops.
    pub fn mean_distance(&self) -> f64 {
        let k = self.len();
        if k < 2 {
            return 0.0;
        }
        let total: f64 = (0..k)
            .flat_map(|i| (0..k).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| self.distance(i, j))
            .sum();
        total / (k * (k - 1)) as f64
    }

    /// Map a tour of stop indices to graph node ids.
    pub fn node_order(&self, tour: &[usize]) -> Vec<NodeId> {
        tour.iter().map(|&i| self.stops[i]).collect()
    }
}
