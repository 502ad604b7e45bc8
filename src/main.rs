//! Route Planner - Command Line Interface
//!
//! Plans routes over JSON road-network graphs, compares strategies and
//! samples saved routes.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use route_planner::benchmark::{Benchmark, BenchmarkConfig};
use route_planner::config::PlannerConfig;
use route_planner::error::Result;
use route_planner::graph::{Graph, GraphData, NodeId};
use route_planner::heuristics::Strategy;
use route_planner::planner::{PlanRequest, PlanResult, Planner};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "route-planner")]
#[command(version = "1.0")]
#[command(about = "Plan near-optimal routes over a road-network graph")]
struct Cli {
    /// Debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a route through the given destinations
    Plan {
        /// Graph JSON file
        #[arg(short, long)]
        graph: PathBuf,

        /// Planning request JSON file; flags below override its fields
        #[arg(short, long)]
        request: Option<PathBuf>,

        /// Start node (defaults to the graph's start)
        #[arg(long)]
        start: Option<NodeId>,

        /// Comma-separated destination node ids
        #[arg(short, long, value_delimiter = ',')]
        destinations: Vec<NodeId>,

        /// heuristic, genetic, annealing, nearest or christofides
        #[arg(short, long)]
        strategy: Option<Strategy>,

        /// Time budget in milliseconds
        #[arg(short, long)]
        budget_ms: Option<u64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Fail instead of returning a route when the budget runs out
        #[arg(long)]
        strict: bool,

        /// Planner config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the plan result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print graph statistics
    Analyze {
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// Compare every strategy on one stop selection
    Compare {
        #[arg(short, long)]
        graph: PathBuf,

        #[arg(long)]
        start: Option<NodeId>,

        #[arg(short, long, value_delimiter = ',', required = true)]
        destinations: Vec<NodeId>,

        /// Seeds per randomized strategy
        #[arg(short, long, default_value = "5")]
        runs: usize,

        #[arg(short, long)]
        budget_ms: Option<u64>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for results.csv, statistics.csv and report.txt
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sample a saved plan result along its stitched path
    Sample {
        /// Plan result JSON file
        #[arg(short, long)]
        result: PathBuf,

        /// Single distance to sample at
        #[arg(short, long)]
        distance: Option<f64>,

        /// Sample every `step` units (default: ten samples, at most 10000)
        #[arg(long)]
        step: Option<f64>,

        /// Travel speed in units per second, to report timings
        #[arg(long)]
        speed: Option<f64>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Plan {
            graph,
            request,
            start,
            destinations,
            strategy,
            budget_ms,
            seed,
            strict,
            config,
            output,
        } => {
            let overrides = RequestOverrides {
                start,
                destinations,
                strategy,
                budget_ms,
                seed,
                strict,
            };
            plan_route(&graph, request.as_deref(), overrides, config.as_deref(), output.as_deref())
        }

        Commands::Analyze { graph } => analyze_graph(&graph),

        Commands::Compare {
            graph,
            start,
            destinations,
            runs,
            budget_ms,
            config,
            output,
        } => compare_strategies(&graph, start, destinations, runs, budget_ms, config.as_deref(), output.as_deref()),

        Commands::Sample {
            result,
            distance,
            step,
            speed,
        } => sample_result(&result, distance, step, speed),
    };

    if let Err(e) = outcome {
        match serde_json::to_string(&e.report()) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}: {}", e.kind(), e),
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    match path {
        Some(p) => PlannerConfig::from_file(p),
        None => Ok(PlannerConfig::default()),
    }
}

/// Load a graph, scaling normalized coordinates into the configured space.
fn load_graph(path: &Path, config: &PlannerConfig) -> Result<Graph> {
    println!("Loading graph from {:?}...", path);
    let data = GraphData::from_file(path)?;
    let space = config.coordinate_space;
    Graph::from_data_in_space(data, space.width, space.height)
}

struct RequestOverrides {
    start: Option<NodeId>,
    destinations: Vec<NodeId>,
    strategy: Option<Strategy>,
    budget_ms: Option<u64>,
    seed: Option<u64>,
    strict: bool,
}

impl RequestOverrides {
    fn apply(self, mut request: PlanRequest) -> PlanRequest {
        if self.start.is_some() {
            request.start_id = self.start;
        }
        if !self.destinations.is_empty() {
            request.destination_ids = self.destinations;
        }
        if let Some(strategy) = self.strategy {
            request.strategy = strategy;
        }
        if self.budget_ms.is_some() {
            request.time_budget_ms = self.budget_ms;
        }
        if let Some(seed) = self.seed {
            request.seed = seed;
        }
        request.strict_budget |= self.strict;
        request
    }
}

fn plan_route(
    graph_path: &Path,
    request_path: Option<&Path>,
    overrides: RequestOverrides,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let graph = load_graph(graph_path, &config)?;

    let base = match request_path {
        Some(p) => PlanRequest::from_file(p)?,
        None => PlanRequest::new(Vec::new()),
    };
    let request = overrides.apply(base);

    println!("Planning with {} strategy...", request.strategy);
    let result = Planner::new(&graph, config).plan(&request)?;

    println!("\n========== Results ==========");
    println!("Strategy: {}", result.strategy);
    println!("Order: {:?}", result.order);
    println!("Distance: {:.2}", result.distance);
    println!("Iterations: {}", result.iters);
    println!("Path points: {}", result.stitched_path.len());
    println!("Time: {} ms", result.elapsed_ms);
    if result.budget_exceeded {
        println!("Budget exceeded: returned the best route found in time");
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(out_path, json)?;
        println!("\nResult saved to {:?}", out_path);
    }

    Ok(())
}

fn analyze_graph(path: &Path) -> Result<()> {
    let graph = load_graph(path, &PlannerConfig::default())?;

    println!("========== Graph Analysis ==========\n");
    println!("{}", graph.statistics());

    if let Some(start) = graph.start_id() {
        let reachable = graph.reachable_from(start);
        let unreachable: Vec<NodeId> = graph
            .nodes()
            .map(|n| n.id)
            .filter(|id| !reachable.contains(id))
            .collect();
        if unreachable.is_empty() {
            println!("\nEvery node is reachable from start {}", start);
        } else {
            println!("\nUnreachable from start {}: {:?}", start, unreachable);
        }
    }

    Ok(())
}

fn compare_strategies(
    graph_path: &Path,
    start: Option<NodeId>,
    destinations: Vec<NodeId>,
    runs: usize,
    budget_ms: Option<u64>,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let planner_config = load_config(config_path)?;
    let graph = load_graph(graph_path, &planner_config)?;

    let mut request = PlanRequest::new(destinations);
    request.start_id = start;

    let config = BenchmarkConfig {
        num_runs: runs,
        time_budget_ms: budget_ms,
        planner: planner_config,
        ..Default::default()
    };

    let mut benchmark = Benchmark::new(config);
    let bar = ProgressBar::new(benchmark.runs_per_scenario() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} runs")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    benchmark = benchmark.with_progress(bar.clone());

    let name = graph_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "graph".to_string());
    println!("Comparing strategies on {} ({} destinations)...\n", name, request.destination_ids.len());

    benchmark.run_request(&name, &graph, &request)?;
    bar.finish_and_clear();

    let report = benchmark.generate_report();
    println!("{}", report);

    if let Some(dir) = output {
        std::fs::create_dir_all(dir)?;

        let results_path = dir.join("results.csv");
        benchmark.export_to_csv(&results_path)?;
        println!("Results exported to {:?}", results_path);

        let stats_path = dir.join("statistics.csv");
        benchmark.export_statistics_csv(&stats_path)?;
        println!("Statistics exported to {:?}", stats_path);

        let report_path = dir.join("report.txt");
        std::fs::write(&report_path, &report)?;
        println!("Report saved to {:?}", report_path);
    }

    Ok(())
}

fn sample_result(path: &Path, distance: Option<f64>, step: Option<f64>, speed: Option<f64>) -> Result<()> {
    let result = PlanResult::from_file(path)?;
    let traversal = result.traversal();
    let total = traversal.total_length();

    println!("Path length: {:.2} ({} points)", total, traversal.points.len());
    if let Some(v) = speed {
        println!("Duration at {:.2} units/s: {:.2} s", v, traversal.duration(v));
    }

    let distances: Vec<f64> = match distance {
        Some(d) => vec![d],
        None => traversal.sample_distances(step),
    };

    println!("\n{:>10} {:>10} {:>10} {:>10}", "Distance", "X", "Y", "Heading");
    println!("{}", "-".repeat(44));
    for d in distances {
        if let Some(sample) = traversal.sample(d) {
            println!(
                "{:>10.2} {:>10.2} {:>10.2} {:>9.1}°",
                d,
                sample.position.x,
                sample.position.y,
                sample.heading.to_degrees()
            );
        }
    }

    Ok(())
}
