//! Heuristics module.
//!
//! This module exports the construction and improvement heuristics and the
//! [`TourSolver`] strategies built from them. Every strategy consumes the
//! same [`DistanceMatrix`] and returns a tour starting at stop 0, so callers
//! can switch strategies without touching the rest of the pipeline.

pub mod construction;
pub mod genetic;
pub mod local_search;

pub use construction::*;
pub use genetic::*;
pub use local_search::*;

use crate::config::PlannerConfig;
use crate::matrix::DistanceMatrix;
use crate::solution::Solution;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Optional wall-clock deadline shared by the solvers of one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Budget {
    deadline: Option<Instant>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Budget { deadline: None }
    }

    pub fn from_millis(ms: u64) -> Self {
        Budget {
            deadline: Some(Instant::now() + Duration::from_millis(ms)),
        }
    }

    /// A budget that is already used up.
    pub fn expired_now() -> Self {
        Budget {
            deadline: Some(Instant::now()),
        }
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A complete `(matrix) -> tour` strategy.
pub trait TourSolver: Send + Sync {
    fn solve(&self, matrix: &DistanceMatrix, budget: &Budget) -> Solution;
    fn name(&self) -> &str;
}

/// Construction heuristic followed by an optional improver.
pub struct ConstructAndImprove {
    name: String,
    constructor: Box<dyn ConstructionHeuristic + Send + Sync>,
    improver: Option<Box<dyn LocalSearch + Send + Sync>>,
}

impl ConstructAndImprove {
    pub fn new<C>(constructor: C) -> Self
    where
        C: ConstructionHeuristic + Send + Sync + 'static,
    {
        ConstructAndImprove {
            name: constructor.name().to_string(),
            constructor: Box::new(constructor),
            improver: None,
        }
    }

    pub fn then<L>(mut self, improver: L) -> Self
    where
        L: LocalSearch + Send + Sync + 'static,
    {
        self.name = format!("{} + {}", self.name, improver.name());
        self.improver = Some(Box::new(improver));
        self
    }
}

impl TourSolver for ConstructAndImprove {
    fn solve(&self, matrix: &DistanceMatrix, budget: &Budget) -> Solution {
        let start = Instant::now();
        let mut solution = self.constructor.construct(matrix);
        log::debug!("{}: constructed tour of cost {:.2}", self.constructor.name(), solution.cost);

        if let Some(improver) = &self.improver {
            improver.improve(matrix, &mut solution, budget);
            log::debug!("{}: improved to cost {:.2}", improver.name(), solution.cost);
        }

        solution.algorithm = self.name.clone();
        solution.computation_time = start.elapsed().as_secs_f64();
        solution
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Genetic algorithm as a [`TourSolver`].
pub struct GeneticSolver {
    pub config: GAConfig,
}

impl TourSolver for GeneticSolver {
    fn solve(&self, matrix: &DistanceMatrix, budget: &Budget) -> Solution {
        GeneticAlgorithm::new(matrix, self.config.clone()).run(budget)
    }

    fn name(&self) -> &str {
        "GeneticAlgorithm"
    }
}

/// Selectable planning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Nearest neighbor followed by 2-opt
    #[default]
    Heuristic,
    Genetic,
    /// Nearest neighbor followed by simulated annealing
    Annealing,
    /// Nearest neighbor only
    Nearest,
    /// Christofides-style construction followed by 2-opt
    Christofides,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Heuristic,
        Strategy::Genetic,
        Strategy::Annealing,
        Strategy::Nearest,
        Strategy::Christofides,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Heuristic => "heuristic",
            Strategy::Genetic => "genetic",
            Strategy::Annealing => "annealing",
            Strategy::Nearest => "nearest",
            Strategy::Christofides => "christofides",
        }
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, Strategy::Genetic | Strategy::Annealing)
    }

    /// Build the solver for this strategy. `seed` drives the randomized ones.
    pub fn solver(&self, config: &PlannerConfig, seed: u64) -> Box<dyn TourSolver> {
        match self {
            Strategy::Heuristic => Box::new(
                ConstructAndImprove::new(NearestNeighborHeuristic::new()).then(config.two_opt.clone()),
            ),
            Strategy::Genetic => Box::new(GeneticSolver {
                config: GAConfig { seed, ..config.genetic.clone() },
            }),
            Strategy::Annealing => Box::new(
                ConstructAndImprove::new(NearestNeighborHeuristic::new())
                    .then(SimulatedAnnealing { seed, ..config.annealing.clone() }),
            ),
            Strategy::Nearest => Box::new(ConstructAndImprove::new(NearestNeighborHeuristic::new())),
            Strategy::Christofides => {
                let constructor = if config.exact_matching {
                    ChristofidesHeuristic::exact()
                } else {
                    ChristofidesHeuristic::new()
                };
                Box::new(ConstructAndImprove::new(constructor).then(config.two_opt.clone()))
            }
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .iter()
            .copied()
            .find(|strategy| strategy.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown strategy '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_matrix() -> DistanceMatrix {
        let points: Vec<(f64, f64)> = (0..9).map(|i| ((i % 3) as f64 * 4.0, (i / 3) as f64 * 3.0)).collect();
        DistanceMatrix::from_rows(
            points
                .iter()
                .map(|a| {
                    points
                        .iter()
                        .map(|b| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt())
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn test_every_strategy_returns_a_tour_from_the_start() {
        let matrix = grid_matrix();
        let config = PlannerConfig::default();
        for strategy in Strategy::ALL {
            let solver = strategy.solver(&config, 11);
            let solution = solver.solve(&matrix, &Budget::unlimited());
            assert!(solution.is_complete(matrix.len()), "{}: {:?}", strategy, solution.tour);
            assert!((solution.cost - matrix.tour_cost(&solution.tour)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_heuristic_not_worse_than_nearest() {
        let matrix = grid_matrix();
        let config = PlannerConfig::default();
        let nearest = Strategy::Nearest.solver(&config, 0).solve(&matrix, &Budget::unlimited());
        let heuristic = Strategy::Heuristic.solver(&config, 0).solve(&matrix, &Budget::unlimited());
        assert!(heuristic.cost <= nearest.cost + 1e-9);
        assert_eq!(heuristic.algorithm, "NearestNeighbor + 2-Opt");
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("genetic".parse::<Strategy>(), Ok(Strategy::Genetic));
        assert_eq!("Annealing".parse::<Strategy>(), Ok(Strategy::Annealing));
        assert!("random".parse::<Strategy>().is_err());
        let json = serde_json::to_string(&Strategy::Christofides).unwrap();
        assert_eq!(json, "\"christofides\"");
    }

    #[test]
    fn test_budget() {
        assert!(!Budget::unlimited().expired());
        assert!(Budget::expired_now().expired());
        assert!(!Budget::from_millis(60_000).expired());
    }
}
