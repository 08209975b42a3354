//! Correlated locations: a point plus the edges it snapped to

use butterfly_common::{GraphId, LatLng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// One edge a location lies on, `percent_along` in [0, 1] from the start
/// of the edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeCandidate {
    pub edge: GraphId,
    pub percent_along: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub position: LatLng,
    pub candidates: Vec<EdgeCandidate>,
}

impl Location {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            candidates: Vec::new(),
        }
    }

    pub fn with_candidate(mut self, edge: GraphId, percent_along: f32) -> Self {
        self.candidates.push(EdgeCandidate {
            edge,
            percent_along,
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(SearchError::InvalidRequest(format!(
                "location {},{} has no edge candidates",
                self.position.lat, self.position.lon
            )));
        }
        for c in &self.candidates {
            if !(0.0..=1.0).contains(&c.percent_along) {
                return Err(SearchError::InvalidRequest(format!(
                    "percent_along {} on edge {} is outside [0, 1]",
                    c.percent_along, c.edge
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_all(locations: &[Location], what: &str) -> Result<()> {
    if locations.is_empty() {
        return Err(SearchError::InvalidRequest(format!("no {what} given")));
    }
    locations.iter().try_for_each(Location::validate)
}
