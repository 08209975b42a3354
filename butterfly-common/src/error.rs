//! Error types shared by graph providers

use thiserror::Error;

use crate::graph_id::GraphId;

/// Failure to read from the graph
///
/// `TileUnavailable` is the only transient variant; the search core never
/// retries it and leaves retry policy to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The tile holding this object could not be loaded
    #[error("tile {} is unavailable", .0.tile_base())]
    TileUnavailable(GraphId),

    #[error("unknown edge {0}")]
    UnknownEdge(GraphId),

    #[error("unknown node {0}")]
    UnknownNode(GraphId),
}

impl GraphError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GraphError::TileUnavailable(_))
    }
}

/// Convenience result type for graph reads
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_unavailable_names_tile() {
        let err = GraphError::TileUnavailable(GraphId::new(2, 77, 5));
        assert_eq!(err.to_string(), "tile 2/77/0 is unavailable");
        assert!(err.is_transient());
    }

    #[test]
    fn test_unknown_edge_is_permanent() {
        let err = GraphError::UnknownEdge(GraphId::new(0, 1, 2));
        assert_eq!(err.to_string(), "unknown edge 0/1/2");
        assert!(!err.is_transient());
    }
}
