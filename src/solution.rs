//! Tour representation and manipulation.
//!
//! A tour is a permutation of stop indices `[0..K)` that always begins with
//! the start stop `0`. Its cost is the open-path cost: the route ends at the
//! last stop and does not return to the start.

use crate::matrix::DistanceMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A tour together with its evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Stop indices in visiting order, starting at 0
    pub tour: Vec<usize>,
    /// Open-path cost of the tour
    pub cost: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (passes, annealing steps, generations)
    pub iterations: Option<usize>,
    /// The time budget ran out before the algorithm finished
    #[serde(default)]
    pub budget_exhausted: bool,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: f64::INFINITY,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
            budget_exhausted: false,
        }
    }

    /// Create a solution from a tour
    pub fn from_tour(matrix: &DistanceMatrix, tour: Vec<usize>, algorithm: &str) -> Self {
        let cost = matrix.tour_cost(&tour);
        Solution {
            tour,
            cost,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
            budget_exhausted: false,
        }
    }

    /// Recompute the cost from scratch
    pub fn validate(&mut self, matrix: &DistanceMatrix) {
        self.cost = matrix.tour_cost(&self.tour);
    }

    /// Check that every stop is visited exactly once, starting at 0
    pub fn is_complete(&self, num_stops: usize) -> bool {
        if self.tour.len() != num_stops || self.tour.first() != Some(&0) {
            return false;
        }

        let unique: HashSet<usize> = self.tour.iter().cloned().collect();
        unique.len() == num_stops && self.tour.iter().all(|&s| s < num_stops)
    }

    /// Cost change of reversing `tour[i+1..=j]`.
    ///
    /// Only the two boundary hops change for a symmetric matrix, but the
    /// interior is re-summed as well so asymmetric input stays exact.
    pub fn two_opt_delta(&self, matrix: &DistanceMatrix, i: usize, j: usize) -> f64 {
        let n = self.tour.len();
        if i + 1 >= j || j >= n {
            return 0.0;
        }

        let t = &self.tour;
        let mut old = matrix.distance(t[i], t[i + 1]);
        let mut new = matrix.distance(t[i], t[j]);
        if j + 1 < n {
            old += matrix.distance(t[j], t[j + 1]);
            new += matrix.distance(t[i + 1], t[j + 1]);
        }
        for k in i + 1..j {
            old += matrix.distance(t[k], t[k + 1]);
            new += matrix.distance(t[k + 1], t[k]);
        }
        new - old
    }

    /// Apply a 2-opt move (reverse segment between i+1 and j)
    pub fn apply_two_opt(&mut self, i: usize, j: usize) {
        self.tour[i + 1..=j].reverse();
    }

    /// Cost change of swapping the stops at positions `i` and `j`
    pub fn swap_delta(&self, matrix: &DistanceMatrix, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }

        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let n = self.tour.len();
        // Hops touching either position, each counted once.
        let mut hops: Vec<usize> = Vec::with_capacity(4);
        for p in [lo, hi] {
            if p > 0 {
                hops.push(p - 1);
            }
            if p + 1 < n {
                hops.push(p);
            }
        }
        hops.sort_unstable();
        hops.dedup();

        let hop_cost = |tour: &[usize]| -> f64 {
            hops.iter().map(|&h| matrix.distance(tour[h], tour[h + 1])).sum()
        };
        let old = hop_cost(&self.tour);
        let mut swapped = self.tour.clone();
        swapped.swap(lo, hi);
        hop_cost(&swapped) - old
    }

    /// Apply a swap move
    pub fn apply_swap(&mut self, i: usize, j: usize) {
        self.tour.swap(i, j);
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        if self.budget_exhausted {
            writeln!(f, "  Budget: exhausted")?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_matrix() -> DistanceMatrix {
        // Stops on a line at x = 0, 1, 2, 3, 4.
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0_f64];
        DistanceMatrix::from_rows(
            xs.iter()
                .map(|a| xs.iter().map(|b| (a - b).abs()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.tour.is_empty());
        assert_eq!(sol.cost, f64::INFINITY);
    }

    #[test]
    fn test_is_complete() {
        let m = line_matrix();
        assert!(Solution::from_tour(&m, vec![0, 2, 1, 4, 3], "t").is_complete(5));
        assert!(!Solution::from_tour(&m, vec![1, 0, 2, 3, 4], "t").is_complete(5));
        assert!(!Solution::from_tour(&m, vec![0, 1, 1, 3, 4], "t").is_complete(5));
        assert!(!Solution::from_tour(&m, vec![0, 1, 2, 3], "t").is_complete(5));
    }

    #[test]
    fn test_move_deltas_match_recomputed_cost() {
        let m = line_matrix();
        let sol = Solution::from_tour(&m, vec![0, 3, 1, 4, 2], "t");
        for i in 0..5 {
            for j in i + 2..5 {
                let mut moved = sol.clone();
                moved.apply_two_opt(i, j);
                moved.validate(&m);
                assert!((sol.two_opt_delta(&m, i, j) - (moved.cost - sol.cost)).abs() < 1e-9);
            }
        }
        for i in 1..5 {
            for j in 1..5 {
                let mut moved = sol.clone();
                moved.apply_swap(i, j);
                moved.validate(&m);
                assert!((sol.swap_delta(&m, i, j) - (moved.cost - sol.cost)).abs() < 1e-9);
            }
        }
    }
}
