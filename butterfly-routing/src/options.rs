//! Request options shared by every driver

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::error::{Result, SearchError};
use crate::time::TimeInfo;

pub const DEFAULT_MAX_LABELS: usize = 4_000_000;
pub const DEFAULT_BUCKET_COUNT: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTimeKind {
    DepartAt,
    ArriveBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateTimeOption {
    pub kind: DateTimeKind,
    pub value: NaiveDateTime,
}

impl DateTimeOption {
    pub fn time_info(&self) -> TimeInfo {
        TimeInfo::from_datetime(self.value)
    }
}

/// Per-level expansion radius in meters of path distance. Once a label has
/// travelled further than the limit of a level it no longer expands onto
/// edges of that level. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HierarchyLimits {
    pub expand_within_distance: [Option<f32>; 3],
}

impl HierarchyLimits {
    pub fn allows(&self, level: u8, distance: f32) -> bool {
        match self.expand_within_distance.get(level as usize) {
            Some(Some(limit)) => distance <= *limit,
            _ => true,
        }
    }
}

/// Options recognised by all drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Labels whose sort cost exceeds this are not expanded
    pub max_cost: Option<f32>,
    /// Labels whose path distance (meters) exceeds this are not created
    pub max_distance: Option<f32>,
    pub max_labels: usize,
    pub timeout_ms: Option<u64>,
    pub use_heuristic: bool,
    /// Queue bucket width in cost units; defaults to the costing unit size
    pub bucket_size: Option<f32>,
    pub bucket_count: usize,
    pub hierarchy_limits: HierarchyLimits,
    pub date_time: Option<DateTimeOption>,
    /// Return matrix/isochrone results flagged partial instead of failing
    /// when a label or time limit trips
    pub allow_partial: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_cost: None,
            max_distance: None,
            max_labels: DEFAULT_MAX_LABELS,
            timeout_ms: None,
            use_heuristic: true,
            bucket_size: None,
            bucket_count: DEFAULT_BUCKET_COUNT,
            hierarchy_limits: HierarchyLimits::default(),
            date_time: None,
            allow_partial: false,
        }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_labels == 0 {
            return Err(SearchError::InvalidRequest("max_labels must be positive".into()));
        }
        if self.bucket_count == 0 {
            return Err(SearchError::InvalidRequest("bucket_count must be positive".into()));
        }
        if let Some(size) = self.bucket_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(SearchError::InvalidRequest(format!(
                    "bucket_size must be a positive number, got {size}"
                )));
            }
        }
        for (name, value) in [("max_cost", self.max_cost), ("max_distance", self.max_distance)] {
            if let Some(v) = value {
                if v.is_nan() || v < 0.0 {
                    return Err(SearchError::InvalidRequest(format!(
                        "{name} must not be negative, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Freeze the options at request start; the timeout becomes an
    /// absolute deadline
    pub fn limits(&self) -> Limits {
        let started = Instant::now();
        Limits {
            max_cost: self.max_cost,
            max_distance: self.max_distance,
            max_labels: self.max_labels,
            started,
            deadline: self.timeout_ms.map(|ms| started + Duration::from_millis(ms)),
            hierarchy: self.hierarchy_limits,
        }
    }

    pub fn time_info(&self) -> Option<TimeInfo> {
        self.date_time.map(|dt| dt.time_info())
    }
}

/// Limits checked by the expansion engine
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_cost: Option<f32>,
    pub max_distance: Option<f32>,
    pub max_labels: usize,
    pub started: Instant,
    pub deadline: Option<Instant>,
    pub hierarchy: HierarchyLimits,
}

impl Limits {
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Whether a finished result respects `max_cost` and `max_distance`
    pub fn admits(&self, cost: f32, distance: f32) -> bool {
        self.max_cost.map_or(true, |max| cost <= max) && self.max_distance.map_or(true, |max| distance <= max)
    }
}
