//! Error taxonomy of the search core

use butterfly_common::{GraphError, GraphId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a search request
///
/// Every variant is fatal to the request it was raised in. None of them is
/// retried inside the core; `TileUnavailable` is the only one a caller may
/// reasonably retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("tile {} is unavailable", .0.tile_base())]
    TileUnavailable(GraphId),

    #[error("graph error: {0}")]
    Graph(GraphError),

    /// Both sides of the search ran out of labels without meeting
    #[error("no path found")]
    NoPathFound,

    #[error("no common meeting point for {0} locations")]
    NoCommonMeetingPoint(usize),

    #[error("label limit of {limit} exceeded")]
    ResourceExceeded { limit: usize },

    #[error("deadline exceeded after {elapsed_ms} ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    /// Raised when the queue is asked to go backwards, which only happens
    /// with negative costs or an inconsistent heuristic
    #[error("invalid costing configuration: {0}")]
    InvalidCostingConfiguration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<GraphError> for SearchError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::TileUnavailable(id) => SearchError::TileUnavailable(id),
            other => SearchError::Graph(other),
        }
    }
}

impl SearchError {
    /// Why a search stopped early, if the error is one that still leaves
    /// usable partial results behind
    pub fn partial_reason(&self) -> Option<PartialReason> {
        match self {
            SearchError::ResourceExceeded { .. } => Some(PartialReason::ResourceExceeded),
            SearchError::DeadlineExceeded { .. } => Some(PartialReason::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Marker attached to matrix and isochrone results cut short by a limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    ResourceExceeded,
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, SearchError>;
