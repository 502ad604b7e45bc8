//! Local search improvement heuristics.
//!
//! This module implements:
//! - 2-opt (segment reversal) descent
//! - Simulated annealing over random pairwise swaps
//!
//! Both keep stop 0 in place and optimise the open-path cost.

use crate::heuristics::Budget;
use crate::matrix::DistanceMatrix;
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Minimum gain for a move to count as an improvement.
const IMPROVEMENT_EPS: f64 = 1e-9;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve `solution` in place. Returns whether its cost went down.
    fn improve(&self, matrix: &DistanceMatrix, solution: &mut Solution, budget: &Budget) -> bool;
    fn name(&self) -> &str;
}

/// 2-Opt Local Search
///
/// Each pass scans every position pair `(i, j)` and reverses `tour[i+1..=j]`
/// as soon as that strictly lowers the cost. Passes repeat until one makes
/// no change, `max_passes` is hit, or the budget expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoOptSearch {
    pub max_passes: usize,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch { max_passes: 100 }
    }
}

impl Default for TwoOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, matrix: &DistanceMatrix, solution: &mut Solution, budget: &Budget) -> bool {
        let n = solution.tour.len();
        if n < 3 {
            return false;
        }

        let initial_cost = solution.cost;
        let mut passes = 0;
        let mut improved = true;

        while improved && passes < self.max_passes {
            if budget.expired() {
                solution.budget_exhausted = true;
                break;
            }
            improved = false;
            passes += 1;

            for i in 0..n - 2 {
                for j in i + 2..n {
                    let delta = solution.two_opt_delta(matrix, i, j);
                    if delta < -IMPROVEMENT_EPS {
                        solution.apply_two_opt(i, j);
                        solution.cost += delta;
                        improved = true;
                    }
                }
            }
        }

        if improved && passes >= self.max_passes {
            log::debug!("2-opt stopped at the pass cap ({})", self.max_passes);
        }

        solution.validate(matrix);
        solution.iterations = Some(solution.iterations.unwrap_or(0) + passes);
        solution.cost < initial_cost - IMPROVEMENT_EPS
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}

/// Simulated Annealing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedAnnealing {
    /// Starting temperature; `None` uses the mean stop-to-stop distance
    pub initial_temp: Option<f64>,
    /// Geometric cooling factor applied every iteration
    pub cooling_rate: f64,
    /// Iteration budget; `None` scales with the number of stops
    pub iterations: Option<usize>,
    /// Random seed
    pub seed: u64,
}

impl SimulatedAnnealing {
    pub fn new() -> Self {
        SimulatedAnnealing {
            initial_temp: None,
            cooling_rate: 0.995,
            iterations: None,
            seed: 42,
        }
    }

    pub fn with_params(initial_temp: f64, cooling_rate: f64, iterations: usize) -> Self {
        SimulatedAnnealing {
            initial_temp: Some(initial_temp),
            cooling_rate,
            iterations: Some(iterations),
            seed: 42,
        }
    }

    /// Default iteration budget for `k` stops.
    pub fn iterations_for(k: usize) -> usize {
        (100 * k).clamp(500, 5000)
    }

    /// Anneal `solution` with random pairwise swaps drawn from `rng`.
    ///
    /// The best tour seen over the whole run is written back, so the result
    /// is never worse than the input.
    pub fn anneal<R: Rng>(
        &self,
        matrix: &DistanceMatrix,
        solution: &mut Solution,
        rng: &mut R,
        budget: &Budget,
    ) -> bool {
        let n = solution.tour.len();
        solution.validate(matrix);
        if n < 3 {
            return false;
        }

        let iterations = self.iterations.unwrap_or_else(|| Self::iterations_for(n));
        let mut temp = self
            .initial_temp
            .unwrap_or_else(|| matrix.mean_distance())
            .max(f64::MIN_POSITIVE);

        let mut current = solution.clone();
        let mut best_tour = current.tour.clone();
        let mut best_cost = current.cost;
        let mut performed = 0;

        for _ in 0..iterations {
            if budget.expired() {
                solution.budget_exhausted = true;
                break;
            }
            performed += 1;

            let i = rng.gen_range(1..n);
            let mut j = rng.gen_range(1..n - 1);
            if j >= i {
                j += 1;
            }

            let delta = current.swap_delta(matrix, i, j);
            let accept = delta < 0.0 || rng.gen::<f64>() < (-delta / temp).exp();
            if accept {
                current.apply_swap(i, j);
                current.cost += delta;
                if current.cost < best_cost - IMPROVEMENT_EPS {
                    best_tour = current.tour.clone();
                    best_cost = current.cost;
                }
            }

            temp *= self.cooling_rate;
        }

        let improved = best_cost < solution.cost - IMPROVEMENT_EPS;
        if improved {
            solution.tour = best_tour;
        }
        solution.validate(matrix);
        solution.iterations = Some(solution.iterations.unwrap_or(0) + performed);
        log::debug!(
            "annealing: {} iterations, final temperature {:.4}, best cost {:.2}",
            performed,
            temp,
            solution.cost
        );

        improved
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for SimulatedAnnealing {
    fn improve(&self, matrix: &DistanceMatrix, solution: &mut Solution, budget: &Budget) -> bool {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.anneal(matrix, solution, &mut rng, budget)
    }

    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }
}
