//! Benchmarking module for comparing planning strategies.
//!
//! Runs every selected strategy over one distance matrix, repeating the
//! randomized ones once per seed, and aggregates the outcome per strategy.

use crate::config::PlannerConfig;
use crate::error::Result;
use crate::graph::Graph;
use crate::heuristics::{Budget, Strategy};
use crate::matrix::DistanceMatrix;
use crate::planner::{PlanRequest, Planner};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single strategy once on a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Strategy name
    pub algorithm: String,
    /// Name of the solver pipeline the strategy ran
    pub solver: String,
    /// Scenario name
    pub scenario: String,
    /// Number of stops, start included
    pub num_stops: usize,
    pub seed: u64,
    /// Open-path tour cost
    pub cost: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
    pub budget_exceeded: bool,
    /// Percentage above the best cost seen on the same scenario
    pub gap_to_best: Option<f64>,
}

/// Aggregated statistics for a strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    pub num_runs: usize,
    pub avg_cost: f64,
    pub best_cost: f64,
    pub worst_cost: f64,
    /// Sample standard deviation of cost, zero for a single run
    pub std_cost: f64,
    pub avg_time: f64,
    pub total_time: f64,
    pub avg_gap: Option<f64>,
    /// Runs cut short by the time budget
    pub budget_exceeded_runs: usize,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeds per randomized strategy
    pub num_runs: usize,
    /// Time budget per run
    pub time_budget_ms: Option<u64>,
    pub strategies: Vec<Strategy>,
    pub planner: PlannerConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            time_budget_ms: None,
            strategies: Strategy::ALL.to_vec(),
            planner: PlannerConfig::default(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
    progress: Option<ProgressBar>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            progress: None,
        }
    }

    /// Advance `bar` by one after every run.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Runs per scenario: deterministic strategies run once.
    pub fn runs_per_scenario(&self) -> usize {
        self.jobs().len()
    }

    fn jobs(&self) -> Vec<(Strategy, u64)> {
        self.config
            .strategies
            .iter()
            .flat_map(|&strategy| {
                let runs = if strategy.is_randomized() { self.config.num_runs.max(1) } else { 1 };
                (0..runs as u64).map(move |seed| (strategy, seed))
            })
            .collect()
    }

    /// Run every job on `matrix` in parallel and record the results.
    pub fn run_scenario(&mut self, name: &str, matrix: &DistanceMatrix) {
        log::info!("Running benchmark on scenario: {} ({} stops)", name, matrix.len());

        let jobs = self.jobs();
        let mut rows: Vec<AlgorithmResult> = jobs
            .par_iter()
            .map(|&(strategy, seed)| {
                let budget = self.config.time_budget_ms.map(Budget::from_millis).unwrap_or_default();
                let solver = strategy.solver(&self.config.planner, seed);
                let solution = solver.solve(matrix, &budget);

                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }

                AlgorithmResult {
                    algorithm: strategy.as_str().to_string(),
                    solver: solution.algorithm.clone(),
                    scenario: name.to_string(),
                    num_stops: matrix.len(),
                    seed,
                    cost: solution.cost,
                    time: solution.computation_time,
                    iterations: solution.iterations,
                    budget_exceeded: solution.budget_exhausted,
                    gap_to_best: None,
                }
            })
            .collect();

        let best = rows.iter().map(|r| r.cost).fold(f64::INFINITY, f64::min);
        for row in &mut rows {
            row.gap_to_best = Some(if best > 0.0 { (row.cost - best) / best * 100.0 } else { 0.0 });
        }

        self.results.extend(rows);
    }

    /// Validate `request` against `graph` and benchmark its stops.
    pub fn run_request(&mut self, name: &str, graph: &Graph, request: &PlanRequest) -> Result<()> {
        let planner = Planner::new(graph, self.config.planner.clone());
        let stops = planner.stops(request)?;
        let matrix = DistanceMatrix::build(graph, &stops)?;
        self.run_scenario(name, &matrix);
        Ok(())
    }

    /// Compute statistics for each strategy, best average cost first
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut by_algorithm: BTreeMap<&str, Vec<&AlgorithmResult>> = BTreeMap::new();
        for result in &self.results {
            by_algorithm.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = by_algorithm
            .into_iter()
            .map(|(algorithm, results)| {
                let costs: Vec<f64> = results.iter().map(|r| r.cost).collect();
                let times: Vec<f64> = results.iter().map(|r| r.time).collect();
                let gaps: Vec<f64> = results.iter().filter_map(|r| r.gap_to_best).collect();

                let std_cost = if costs.len() > 1 { Statistics::std_dev(&costs) } else { 0.0 };
                let avg_gap = if gaps.is_empty() { None } else { Some(Statistics::mean(&gaps)) };

                AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    num_runs: results.len(),
                    avg_cost: Statistics::mean(&costs),
                    best_cost: Statistics::min(&costs),
                    worst_cost: Statistics::max(&costs),
                    std_cost,
                    avg_time: Statistics::mean(&times),
                    total_time: times.iter().sum(),
                    avg_gap,
                    budget_exceeded_runs: results.iter().filter(|r| r.budget_exceeded).count(),
                }
            })
            .collect();

        statistics.sort_by(|a, b| a.avg_cost.total_cmp(&b.avg_cost));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       Route Planner Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str("Strategy Performance Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<14} {:>6} {:>12} {:>12} {:>10} {:>10} {:>10}\n",
            "Strategy", "Runs", "Avg Cost", "Best Cost", "Std", "Avg Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            let gap_str = stat.avg_gap.map(|g| format!("{:.2}%", g)).unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<14} {:>6} {:>12.2} {:>12.2} {:>10.2} {:>10} {:>10.4}\n",
                stat.algorithm, stat.num_runs, stat.avg_cost, stat.best_cost, stat.std_cost, gap_str, stat.avg_time
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        report.push_str("\nBest Route per Scenario:\n");

        let mut scenario_best: BTreeMap<&str, &AlgorithmResult> = BTreeMap::new();
        for result in &self.results {
            let entry = scenario_best.entry(result.scenario.as_str()).or_insert(result);
            if result.cost < entry.cost {
                *entry = result;
            }
        }

        for (scenario, best) in &scenario_best {
            report.push_str(&format!(
                "  {}: {:.2} ({}, seed {})\n",
                scenario, best.cost, best.solver, best.seed
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }
}
