//! Cost oracle consumed by the search
//!
//! The search never interprets costs beyond adding and comparing them. A
//! `Costing` decides what an edge or a turn costs and whether it may be
//! taken at all (`None` = forbidden).

use butterfly_common::LatLng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

use crate::graph::{EdgeAttributes, TurnContext};
use crate::time::TimeInfo;

pub mod speed;
pub mod turn_penalty;

pub use speed::{CostingOptions, Mode, SpeedCosting};
pub use turn_penalty::TurnPenaltyConfig;

/// Generalized cost plus the travel time behind it
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cost {
    pub cost: f32,
    pub secs: f32,
}

impl Cost {
    pub const ZERO: Cost = Cost { cost: 0.0, secs: 0.0 };

    pub fn new(cost: f32, secs: f32) -> Self {
        Self { cost, secs }
    }

    pub fn scale(self, factor: f32) -> Cost {
        Cost {
            cost: self.cost * factor,
            secs: self.secs * factor,
        }
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost {
            cost: self.cost + rhs.cost,
            secs: self.secs + rhs.secs,
        }
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.cost += rhs.cost;
        self.secs += rhs.secs;
    }
}

impl Sub for Cost {
    type Output = Cost;

    fn sub(self, rhs: Cost) -> Cost {
        Cost {
            cost: self.cost - rhs.cost,
            secs: self.secs - rhs.secs,
        }
    }
}

/// Edge and transition cost oracle
///
/// Shared read-only between concurrent searches. Costs must be
/// non-negative and `heuristic` must never exceed the true remaining cost,
/// otherwise the queue reports an invalid costing configuration.
pub trait Costing: Send + Sync {
    /// Cost of traversing the whole edge, entering it at `time`
    fn edge_cost(&self, edge: &EdgeAttributes, time: Option<TimeInfo>) -> Option<Cost>;

    /// Cost of the turn from `from` onto `to` (travel order)
    fn transition_cost(
        &self,
        from: &EdgeAttributes,
        to: &EdgeAttributes,
        turn: &TurnContext,
    ) -> Option<Cost>;

    /// Lower bound of the cost between two positions
    fn heuristic(&self, from: LatLng, to: LatLng) -> f32;

    /// Natural granularity of costs, used as the default queue bucket width
    fn unit_size(&self) -> f32 {
        1.0
    }
}
