//! Label-setting search core and the drivers built on it
//!
//! Every algorithm runs the same [`ExpansionEngine`] loop; drivers differ in
//! how many engines they run, in which direction, and when they stop:
//!
//! | driver | engines | stops when |
//! |---|---|---|
//! | [`route_bidirectional`] | forward + reverse | best connection beats both queue fronts |
//! | [`route_unidirectional`] | one, forward or reverse | the target is final |
//! | [`cost_matrix`] | one per source (or per target) | all targets are final |
//! | [`isochrone`] | one, seeded at all origins | the largest threshold is passed |
//! | [`centroid`] | one per location | no queue can beat the best meeting edge |

pub mod astar;
pub mod bidirectional;
pub mod centroid;
pub mod expansion;
pub mod isochrone;
pub mod label;
pub mod matrix;
pub mod path;
pub mod queue;
pub mod targets;

pub use astar::route_unidirectional;
pub use bidirectional::route_bidirectional;
pub use centroid::{centroid, Centroid};
pub use expansion::{Arrival, EngineState, ExpansionEngine, ExpansionStats, Step};
pub use isochrone::{isochrone, Contour, FrontierEdge, Isochrone, ReachedEdge};
pub use label::{Allocation, EdgeLabel, EdgeStatus, LabelStatus, LabelStore, NO_PREDECESSOR};
pub use matrix::{cost_matrix, CostMatrix, MatrixCell};
pub use path::{Route, RouteEdge};
pub use queue::{BucketQueue, QueueError};
pub use targets::{TargetHit, TargetSet};
