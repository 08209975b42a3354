//! Travel-time costing from edge speeds
//!
//! Cost is seconds. Edge time is length over the mode's speed; turns add the
//! OSRM-style penalty of the mode. The heuristic divides the straight-line
//! distance by the fastest speed the mode can ever reach, shaved by 1 % to
//! absorb rounding, so it stays a lower bound as long as edges are at least
//! as long as the straight line between their end nodes.

use butterfly_common::LatLng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Cost, Costing, TurnPenaltyConfig};
use crate::error::{Result, SearchError};
use crate::graph::{access, EdgeAttributes, TurnContext};
use crate::time::TimeInfo;

const HEURISTIC_FACTOR: f32 = 0.99;
const DEFAULT_CAR_MAX_SPEED_KPH: f32 = 140.0;
const DEFAULT_WALKING_SPEED_KPH: f32 = 5.1;
const DEFAULT_CYCLING_SPEED_KPH: f32 = 18.0;
/// Hours of the day (local) during which congested speeds apply
const CONGESTED_HOURS: std::ops::Range<u32> = 7..19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Car,
    Bike,
    Foot,
}

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[Mode::Car, Mode::Bike, Mode::Foot]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Car => "car",
            Mode::Bike => "bike",
            Mode::Foot => "foot",
        }
    }

    pub fn access_bit(&self) -> u8 {
        match self {
            Mode::Car => access::CAR,
            Mode::Bike => access::BIKE,
            Mode::Foot => access::FOOT,
        }
    }

    pub fn turn_penalties(&self) -> TurnPenaltyConfig {
        match self {
            Mode::Car => TurnPenaltyConfig::car(),
            Mode::Bike => TurnPenaltyConfig::bike(),
            Mode::Foot => TurnPenaltyConfig::foot(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Mode::all()
            .iter()
            .copied()
            .find(|m| m.name() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown mode '{s}', expected car, bike or foot"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostingOptions {
    pub mode: Mode,
    /// Cap on any speed used; defaults to 140 km/h for cars and to the
    /// walking/cycling speed for the other modes
    pub max_speed_kph: Option<f32>,
    pub turn_penalties: bool,
    /// Use congested speeds during the day when the request carries a time
    pub use_time_dependent_speeds: bool,
    pub ignore_restrictions: bool,
    pub walking_speed_kph: f32,
    pub cycling_speed_kph: f32,
}

impl Default for CostingOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Car,
            max_speed_kph: None,
            turn_penalties: true,
            use_time_dependent_speeds: false,
            ignore_restrictions: false,
            walking_speed_kph: DEFAULT_WALKING_SPEED_KPH,
            cycling_speed_kph: DEFAULT_CYCLING_SPEED_KPH,
        }
    }
}

impl CostingOptions {
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeedCosting {
    options: CostingOptions,
    turn_config: TurnPenaltyConfig,
    top_speed_kph: f32,
}

impl SpeedCosting {
    pub fn new(options: CostingOptions) -> Result<Self> {
        let positive = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SearchError::InvalidCostingConfiguration(format!(
                    "{name} must be positive, got {v}"
                )))
            }
        };
        positive("walking_speed_kph", options.walking_speed_kph)?;
        positive("cycling_speed_kph", options.cycling_speed_kph)?;
        if let Some(max) = options.max_speed_kph {
            positive("max_speed_kph", max)?;
        }

        let mode_top = match options.mode {
            Mode::Car => DEFAULT_CAR_MAX_SPEED_KPH,
            Mode::Bike => options.cycling_speed_kph,
            Mode::Foot => options.walking_speed_kph,
        };
        let top_speed_kph = options.max_speed_kph.map_or(mode_top, |m| m.min(mode_top));

        Ok(Self {
            turn_config: options.mode.turn_penalties(),
            options,
            top_speed_kph,
        })
    }

    pub fn options(&self) -> &CostingOptions {
        &self.options
    }

    /// Speed used on an edge, never above the top speed
    pub fn speed_kph(&self, edge: &EdgeAttributes, time: Option<TimeInfo>) -> f32 {
        let base = match self.options.mode {
            Mode::Car => match (time, edge.congested_speed_kph) {
                (Some(t), Some(congested))
                    if self.options.use_time_dependent_speeds
                        && CONGESTED_HOURS.contains(&t.hour()) =>
                {
                    congested
                }
                _ => edge.speed_kph,
            },
            Mode::Bike => edge.speed_kph.min(self.options.cycling_speed_kph),
            Mode::Foot => self.options.walking_speed_kph,
        };
        base.min(self.top_speed_kph)
    }
}

impl Costing for SpeedCosting {
    fn edge_cost(&self, edge: &EdgeAttributes, time: Option<TimeInfo>) -> Option<Cost> {
        if edge.access & self.options.mode.access_bit() == 0 {
            return None;
        }
        let kph = self.speed_kph(edge, time);
        if kph <= 0.0 {
            return None;
        }
        let secs = edge.length_m / (kph / 3.6);
        Some(Cost::new(secs, secs))
    }

    fn transition_cost(
        &self,
        from: &EdgeAttributes,
        _to: &EdgeAttributes,
        turn: &TurnContext,
    ) -> Option<Cost> {
        if !self.options.ignore_restrictions
            && turn.local_index < 32
            && from.restrictions & (1u32 << turn.local_index) != 0
        {
            return None;
        }
        if !self.options.turn_penalties {
            return Some(Cost::ZERO);
        }
        let secs = self.turn_config.penalty_secs(turn);
        Some(Cost::new(secs, secs))
    }

    fn heuristic(&self, from: LatLng, to: LatLng) -> f32 {
        let meters = from.distance_to(&to) as f32;
        HEURISTIC_FACTOR * meters / (self.top_speed_kph / 3.6)
    }
}
