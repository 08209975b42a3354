//! Read-only graph access consumed by the search
//!
//! The production tile store lives outside this crate. Searches only see the
//! `GraphReader` trait; `MemoryGraph` is the in-process implementation used
//! by the command line tool and the tests.

use butterfly_common::{GraphError, GraphId, LatLng};
use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::{EdgeSpec, GraphSpec, GraphSpecError, MemoryGraph, NodeSpec, RestrictionSpec};

/// Access bits on `EdgeAttributes::access`
pub mod access {
    pub const CAR: u8 = 1 << 0;
    pub const BIKE: u8 = 1 << 1;
    pub const FOOT: u8 = 1 << 2;
    pub const ALL: u8 = CAR | BIKE | FOOT;
}

/// Which way a search walks the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From the origin, following edges in travel order
    Forward,
    /// From the destination, walking edges against travel order
    Reverse,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeAttributes {
    pub id: GraphId,
    pub start_node: GraphId,
    pub end_node: GraphId,
    pub length_m: f32,
    pub speed_kph: f32,
    pub congested_speed_kph: Option<f32>,
    pub access: u8,
    /// Bit `i` forbids turning onto the outbound edge with local index `i`
    /// at `end_node`
    pub restrictions: u32,
    /// Edge belongs to a region with no through traffic (cul-de-sac,
    /// parking aisle)
    pub not_thru: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeAttributes {
    pub id: GraphId,
    pub position: LatLng,
    pub has_signal: bool,
    /// Number of distinct roads meeting at the node
    pub degree: u8,
}

/// Geometry of the turn between two consecutive edges, always described in
/// travel order (from the inbound edge onto the outbound edge)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnContext {
    pub node: GraphId,
    /// Position of the outbound edge among the node's outbound edges
    pub local_index: u8,
    /// Signed turn angle in degrees, positive = right
    pub turn_degree: i16,
    pub node_degree: u8,
    pub has_signal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub edge: GraphId,
    pub turn: TurnContext,
}

/// Read-only view of the routing graph
///
/// Implementations are shared between concurrent searches and must be safe
/// to call from several threads; their own caching is their business.
pub trait GraphReader: Send + Sync {
    fn edge(&self, id: GraphId) -> Result<EdgeAttributes, GraphError>;

    fn node(&self, id: GraphId) -> Result<NodeAttributes, GraphError>;

    /// Append the neighbours of `edge` to `out`. Forward: edges leaving the
    /// end node. Reverse: edges entering the start node.
    fn transitions(
        &self,
        edge: GraphId,
        direction: Direction,
        out: &mut Vec<Transition>,
    ) -> Result<(), GraphError>;
}
