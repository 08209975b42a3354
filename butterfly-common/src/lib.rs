//! Common types for the butterfly-osm routing toolkit

pub mod error;
pub mod geo;
pub mod graph_id;

pub use error::{GraphError, Result};
pub use geo::LatLng;
pub use graph_id::{GraphId, TileHierarchy, TileLevel};
