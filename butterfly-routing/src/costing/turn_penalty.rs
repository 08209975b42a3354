//! Turn penalty model - OSRM-compatible sigmoid-based turn costs
//!
//! Uses OSRM's turn penalty formula from car.lua:
//! - sigmoid mapping turn angle to penalty
//! - turn_penalty = 7.5 seconds (max)
//! - turn_bias = 1.075 (right-turn preference for right-hand traffic)
//! - u_turn_penalty = 20 seconds additional
//!
//! Reference: https://github.com/Project-OSRM/osrm-backend/blob/master/profiles/car.lua

use serde::{Deserialize, Serialize};

use crate::graph::TurnContext;

/// Turns sharper than this are U-turns
const U_TURN_DEGREES: i16 = 170;

/// Turn penalty configuration (mode-specific, OSRM-compatible)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnPenaltyConfig {
    /// Maximum turn penalty in deciseconds (OSRM: 7.5s = 75 ds)
    pub turn_penalty_ds: u32,

    /// Asymmetry between left and right turns (OSRM: 1.075).
    /// >1.0 = prefer right turns (right-hand traffic)
    pub turn_bias: f64,

    /// Additional U-turn penalty in deciseconds (OSRM: 20s = 200 ds)
    pub u_turn_penalty_ds: u32,

    /// Minimum number of roads at the node before a penalty applies
    pub min_degree_for_penalty: u8,

    /// Traffic signal delay in deciseconds
    pub signal_delay_ds: u32,
}

impl TurnPenaltyConfig {
    pub fn car() -> Self {
        Self {
            turn_penalty_ds: 75,
            turn_bias: 1.075,
            u_turn_penalty_ds: 200,
            min_degree_for_penalty: 3,
            signal_delay_ds: 80,
        }
    }

    pub fn bike() -> Self {
        Self {
            turn_penalty_ds: 40,
            turn_bias: 1.4,
            u_turn_penalty_ds: 50,
            min_degree_for_penalty: 3,
            signal_delay_ds: 50,
        }
    }

    /// Pedestrians pay a flat crossing cost at complex intersections
    /// instead of an angle-based penalty
    pub fn foot() -> Self {
        Self {
            turn_penalty_ds: 20,
            turn_bias: 1.0,
            u_turn_penalty_ds: 0,
            min_degree_for_penalty: 4,
            signal_delay_ds: 40,
        }
    }

    /// Penalty for one turn in deciseconds
    ///
    /// ```text
    /// penalty = turn_penalty / (1 + exp(-((13 / turn_bias) * -angle/180 - 6.5 * turn_bias)))
    /// ```
    /// ~0 going straight, ~turn_penalty for a U-turn, asymmetric through
    /// `turn_bias`. Our angles are positive to the right, OSRM's to the left.
    pub fn penalty_ds(&self, turn: &TurnContext) -> u32 {
        if turn.node_degree < self.min_degree_for_penalty {
            return 0;
        }

        let mut penalty = 0u32;
        if (self.turn_bias - 1.0).abs() < 0.001 {
            penalty = self.turn_penalty_ds;
        } else if self.turn_penalty_ds > 0 {
            let angle = turn.turn_degree as f64;
            let exponent = -((13.0 / self.turn_bias) * (-angle / 180.0) - 6.5 * self.turn_bias);
            let sigmoid = 1.0 / (1.0 + exponent.exp());
            penalty = (self.turn_penalty_ds as f64 * sigmoid).round() as u32;

            if turn.turn_degree.abs() >= U_TURN_DEGREES {
                penalty = penalty.saturating_add(self.u_turn_penalty_ds);
            }
        }

        if turn.has_signal {
            penalty = penalty.saturating_add(self.signal_delay_ds);
        }
        penalty
    }

    pub fn penalty_secs(&self, turn: &TurnContext) -> f32 {
        self.penalty_ds(turn) as f32 / 10.0
    }
}
