//! Error types for route planning.
//!
//! Every failure here is terminal for the planning request that raised it:
//! retrying the same deterministic computation over the same data cannot
//! succeed, so callers surface the error instead of looping.

use crate::graph::NodeId;
use crate::planner::PlanResult;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PlanError {
    #[error("cannot reach stop {to} from stop {from}")]
    UnreachableStop { from: NodeId, to: NodeId },
    #[error("no destinations selected")]
    EmptySelection,
    #[error("invalid stop selection: {0}")]
    InvalidSelection(String),
    #[error("graph inconsistency: {0}")]
    GraphInconsistency(String),
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
    #[error("time budget of {budget_ms} ms exceeded before the solver converged")]
    BudgetExceeded {
        budget_ms: u64,
        /// Best route found before the budget ran out.
        best: Box<PlanResult>,
    },
    #[error("planning worker stopped without delivering a result")]
    WorkerLost,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;

impl PlanError {
    pub fn invalid_selection(message: impl Into<String>) -> Self {
        Self::InvalidSelection(message.into())
    }

    pub fn inconsistency(message: impl Into<String>) -> Self {
        Self::GraphInconsistency(message.into())
    }

    pub fn invalid_graph(message: impl Into<String>) -> Self {
        Self::InvalidGraph(message.into())
    }

    /// Stable machine-readable kind, used in [`ErrorReport`].
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::UnreachableStop { .. } => "UnreachableStop",
            PlanError::EmptySelection => "EmptySelection",
            PlanError::InvalidSelection(_) => "InvalidSelection",
            PlanError::GraphInconsistency(_) => "GraphInconsistency",
            PlanError::InvalidGraph(_) => "InvalidGraph",
            PlanError::BudgetExceeded { .. } => "BudgetExceeded",
            PlanError::WorkerLost => "WorkerLost",
            PlanError::Io(_) => "Io",
            PlanError::Json(_) => "Json",
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from(self)
    }
}

/// Serializable `{ kind, message }` error object handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
}

impl From<&PlanError> for ErrorReport {
    fn from(err: &PlanError) -> Self {
        ErrorReport {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
