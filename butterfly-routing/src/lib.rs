//! # butterfly-routing
//!
//! Path-search core of the butterfly-osm tiled routing engine.
//!
//! Every algorithm here is the same edge-based label-setting loop run with a
//! different driver:
//!
//! - [`find_route`]: point to point, bidirectional A* (or unidirectional
//!   when a departure or arrival time is given)
//! - [`cost_matrix`]: many to many
//! - [`isochrone`]: everything reachable within cost thresholds
//! - [`centroid`]: cheapest common meeting edge of several locations
//!
//! Searches read the graph through [`GraphReader`] and price it through
//! [`Costing`]. Both are shared read-only between concurrent requests; every
//! request owns its label stores and queues.
//!
//! ```no_run
//! use butterfly_routing::{find_route, MemoryGraph, SearchOptions, SpeedCosting, CostingOptions};
//!
//! let graph = MemoryGraph::from_json(&std::fs::read_to_string("graph.json")?)?;
//! let costing = SpeedCosting::new(CostingOptions::default())?;
//! let from = graph.origin_at(graph.node_id(1).unwrap()).unwrap();
//! let to = graph.destination_at(graph.node_id(42).unwrap()).unwrap();
//! let route = find_route(&graph, &costing, &from, &to, &SearchOptions::default())?;
//! println!("{} s over {} edges", route.cost.secs, route.edges.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod costing;
pub mod error;
pub mod graph;
pub mod location;
pub mod options;
pub mod search;
pub mod time;

pub use butterfly_common::{GraphError, GraphId, LatLng};
pub use costing::{Cost, Costing, CostingOptions, Mode, SpeedCosting, TurnPenaltyConfig};
pub use error::{PartialReason, Result, SearchError};
pub use graph::{Direction, EdgeAttributes, GraphReader, GraphSpec, MemoryGraph, NodeAttributes};
pub use location::{EdgeCandidate, Location};
pub use options::{DateTimeKind, DateTimeOption, HierarchyLimits, SearchOptions};
pub use search::path::recost;
pub use search::{
    centroid, cost_matrix, isochrone, route_bidirectional, route_unidirectional, Centroid, Contour, CostMatrix,
    FrontierEdge, Isochrone, MatrixCell, ReachedEdge, Route, RouteEdge,
};
pub use time::TimeInfo;

/// Cheapest route from `origin` to `destination`
///
/// Without a date and time both ends are searched at once. With one, only
/// the end whose time is known can be priced: the search runs forward from a
/// departure or backwards from an arrival.
pub fn find_route<G, C>(
    graph: &G,
    costing: &C,
    origin: &Location,
    destination: &Location,
    options: &SearchOptions,
) -> Result<Route>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    match options.date_time.map(|dt| dt.kind) {
        None => route_bidirectional(graph, costing, origin, destination, options),
        Some(DateTimeKind::DepartAt) => {
            route_unidirectional(graph, costing, origin, destination, options, Direction::Forward)
        }
        Some(DateTimeKind::ArriveBy) => {
            route_unidirectional(graph, costing, origin, destination, options, Direction::Reverse)
        }
    }
}
