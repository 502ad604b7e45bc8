//! Planning pipeline: stop selection to stitched route.
//!
//! [`Planner::plan`] validates a [`PlanRequest`], builds the distance matrix,
//! runs the requested strategy under the request's time budget and stitches
//! the winning order into road geometry. [`spawn_plan`] runs the same
//! pipeline on a worker thread and hands back exactly one message.

use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::graph::{Graph, NodeId, Point};
use crate::heuristics::{Budget, Strategy};
use crate::matrix::DistanceMatrix;
use crate::sampler::Traversal;
use crate::stitch::stitch;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

fn default_seed() -> u64 {
    42
}

/// What to plan: a start, the destinations and how to order them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    /// Falls back to the graph's designated start when absent.
    #[serde(default)]
    pub start_id: Option<NodeId>,
    pub destination_ids: Vec<NodeId>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fail with `BudgetExceeded` instead of returning a flagged result.
    #[serde(default)]
    pub strict_budget: bool,
}

impl PlanRequest {
    pub fn new(destination_ids: Vec<NodeId>) -> Self {
        PlanRequest {
            start_id: None,
            destination_ids,
            strategy: Strategy::default(),
            time_budget_ms: None,
            seed: default_seed(),
            strict_budget: false,
        }
    }

    pub fn with_start(mut self, start: NodeId) -> Self {
        self.start_id = Some(start);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_budget(mut self, ms: u64) -> Self {
        self.time_budget_ms = Some(ms);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_budget = true;
        self
    }

    /// Load a request from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Outcome of a successful planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    /// Visiting order as graph node ids, start first.
    pub order: Vec<NodeId>,
    pub stitched_path: Vec<Point>,
    /// Open-path cost of `order`.
    pub distance: f64,
    /// Passes, annealing steps or generations the solver ran.
    pub iters: usize,
    pub strategy: Strategy,
    /// The solver stopped early because the time budget ran out.
    #[serde(default)]
    pub budget_exceeded: bool,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl PlanResult {
    /// Load a saved result from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Constant-speed playback over the stitched path.
    pub fn traversal(&self) -> Traversal {
        Traversal::new(self.stitched_path.clone())
    }
}

/// Runs planning requests against one read-only graph.
pub struct Planner<'g> {
    graph: &'g Graph,
    config: PlannerConfig,
}

impl<'g> Planner<'g> {
    pub fn new(graph: &'g Graph, config: PlannerConfig) -> Self {
        Planner { graph, config }
    }

    pub fn graph(&self) -> &Graph {
        self.graph
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Validate the request and return its stops, start first.
    ///
    /// Destinations missing from the graph are left for the matrix builder,
    /// which reports them as `UnreachableStop`.
    pub fn stops(&self, request: &PlanRequest) -> Result<Vec<NodeId>> {
        if request.destination_ids.is_empty() {
            return Err(PlanError::EmptySelection);
        }

        let start = request
            .start_id
            .or_else(|| self.graph.start_id())
            .ok_or_else(|| PlanError::invalid_selection("no start node given and the graph has none"))?;
        if !self.graph.contains(start) {
            return Err(PlanError::invalid_selection(format!(
                "start node {} is not in the graph",
                start
            )));
        }

        if request.destination_ids.len() > self.config.max_destinations {
            return Err(PlanError::invalid_selection(format!(
                "{} destinations requested, at most {} allowed",
                request.destination_ids.len(),
                self.config.max_destinations
            )));
        }

        let mut seen = HashSet::new();
        for &id in &request.destination_ids {
            if id == start {
                return Err(PlanError::invalid_selection(format!(
                    "start node {} is also listed as a destination",
                    id
                )));
            }
            if !seen.insert(id) {
                return Err(PlanError::invalid_selection(format!("destination {} is listed twice", id)));
            }
        }

        let mut stops = Vec::with_capacity(request.destination_ids.len() + 1);
        stops.push(start);
        stops.extend_from_slice(&request.destination_ids);
        Ok(stops)
    }

    /// Run the full pipeline for one request.
    pub fn plan(&self, request: &PlanRequest) -> Result<PlanResult> {
        let started = Instant::now();
        let budget = request.time_budget_ms.map(Budget::from_millis).unwrap_or_default();

        let stops = self.stops(request)?;
        let matrix = DistanceMatrix::build(self.graph, &stops)?;
        debug!("distance matrix ready for {} stops", matrix.len());

        let solver = request.strategy.solver(&self.config, request.seed);
        let solution = solver.solve(&matrix, &budget);
        debug!("{}: {}", solver.name(), solution);

        let stitched = stitch(self.graph, &solution.tour, &matrix, self.config.stitch_epsilon)?;

        let result = PlanResult {
            order: matrix.node_order(&solution.tour),
            stitched_path: stitched.points,
            distance: stitched.cost,
            iters: solution.iterations.unwrap_or(0),
            strategy: request.strategy,
            budget_exceeded: solution.budget_exhausted,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if result.budget_exceeded {
            let budget_ms = request.time_budget_ms.unwrap_or(0);
            if request.strict_budget {
                return Err(PlanError::BudgetExceeded {
                    budget_ms,
                    best: Box::new(result),
                });
            }
            warn!(
                "{} stopped after {} ms budget; returning best route so far (distance {:.2})",
                request.strategy, budget_ms, result.distance
            );
        }

        info!(
            "planned {} stops with {} in {} ms: distance {:.2}, {} iterations",
            stops.len(),
            request.strategy,
            result.elapsed_ms,
            result.distance,
            result.iters
        );
        Ok(result)
    }
}

/// Handle to a planning run on a worker thread.
pub struct PlanHandle {
    receiver: Receiver<Result<PlanResult>>,
    worker: JoinHandle<()>,
}

impl PlanHandle {
    /// Block until the worker delivers its result.
    pub fn wait(self) -> Result<PlanResult> {
        self.receiver.recv().unwrap_or(Err(PlanError::WorkerLost))
    }

    /// Poll for the result without blocking.
    ///
    /// The result is delivered once; polling again after it has been taken
    /// reports `WorkerLost`.
    pub fn try_result(&self) -> Option<Result<PlanResult>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PlanError::WorkerLost)),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Abandon the run. The worker finishes in the background and its
    /// result is dropped.
    pub fn cancel(self) {
        debug!("planning run cancelled");
    }
}

/// Run [`Planner::plan`] on a background thread.
pub fn spawn_plan(graph: Arc<Graph>, config: PlannerConfig, request: PlanRequest) -> PlanHandle {
    let (sender, receiver) = mpsc::channel();

    let worker = thread::spawn(move || {
        let result = Planner::new(&graph, config).plan(&request);
        if sender.send(result).is_err() {
            debug!("planning result discarded: handle was dropped");
        }
    });

    PlanHandle { receiver, worker }
}
