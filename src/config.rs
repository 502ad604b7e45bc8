//! Planner configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "max_destinations": 8, "annealing": { "cooling_rate": 0.99 } }
//! ```

use crate::error::Result;
use crate::heuristics::{GAConfig, SimulatedAnnealing, TwoOptSearch};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Working coordinate space normalized graphs are scaled into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub width: f64,
    pub height: f64,
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        CoordinateSpace { width: 1000.0, height: 1000.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Upper bound on destinations per request
    pub max_destinations: usize,
    /// Distance under which consecutive stitched points are merged
    pub stitch_epsilon: f64,
    pub coordinate_space: CoordinateSpace,
    pub two_opt: TwoOptSearch,
    pub annealing: SimulatedAnnealing,
    pub genetic: GAConfig,
    /// Use exact odd-vertex matching in the Christofides strategy
    pub exact_matching: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            max_destinations: 12,
            stitch_epsilon: 0.01,
            coordinate_space: CoordinateSpace::default(),
            two_opt: TwoOptSearch::default(),
            annealing: SimulatedAnnealing::default(),
            genetic: GAConfig::default(),
            exact_matching: false,
        }
    }
}

impl PlannerConfig {
    /// Load a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }
}
