//! Route Planner Library
//!
//! Plans near-optimal visiting orders over a road-network graph and turns
//! them into continuous, constant-speed traversable routes.
//!
//! # Features
//!
//! - Dijkstra shortest paths with deterministic tie-breaking
//! - Stop-to-stop distance matrix with cached node paths
//! - Tour strategies: nearest neighbor, 2-opt, Christofides-style,
//!   simulated annealing and a genetic algorithm
//! - Path stitching over edge polylines and arc-length sampling
//! - Background planning runs and strategy benchmarking
//!
//! # Example
//!
//! ```no_run
//! use route_planner::config::PlannerConfig;
//! use route_planner::graph::Graph;
//! use route_planner::heuristics::Strategy;
//! use route_planner::planner::{PlanRequest, Planner};
//!
//! let graph = Graph::from_file("city.json").unwrap();
//! let planner = Planner::new(&graph, PlannerConfig::default());
//!
//! let request = PlanRequest::new(vec![4, 9, 17])
//!     .with_strategy(Strategy::Annealing)
//!     .with_budget(200);
//! let result = planner.plan(&request).unwrap();
//!
//! println!("order {:?}, distance {:.2}", result.order, result.distance);
//! let halfway = result.traversal().sample(result.distance / 2.0);
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod graph;
pub mod heuristics;
pub mod matrix;
pub mod planner;
pub mod sampler;
pub mod shortest_path;
pub mod solution;
pub mod stitch;

pub use config::PlannerConfig;
pub use error::{ErrorReport, PlanError, Result};
pub use graph::{Graph, GraphData, NodeId, Point};
pub use heuristics::{Budget, Strategy};
pub use matrix::DistanceMatrix;
pub use planner::{spawn_plan, PlanHandle, PlanRequest, PlanResult, Planner};
pub use sampler::{sample_at_distance, ArcLengthTable, Sample, Traversal};
pub use solution::Solution;
pub use stitch::{stitch, StitchedPath};
