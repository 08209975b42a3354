//! Label arena and edge status table
//!
//! Labels live in a flat vector and point at their predecessor by slot
//! index. The status table maps each edge to its one live label, so a
//! second label for the same edge becomes an in-place update (while
//! temporary) or is dropped (once permanent).

use butterfly_common::GraphId;
use rustc_hash::FxHashMap;

use crate::costing::Cost;
use crate::graph::Direction;
use crate::time::TimeInfo;

/// Predecessor of an origin label
pub const NO_PREDECESSOR: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStatus {
    Unreached,
    Temporary,
    Permanent,
}

/// Best known way to reach the far end of an edge (in search direction)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLabel {
    pub predecessor: u32,
    pub edge_id: GraphId,
    /// Accumulated cost, including this edge (or its seeded share)
    pub cost: Cost,
    /// `cost.cost` plus the heuristic to the search target
    pub sort_cost: f32,
    /// Accumulated path distance in meters
    pub distance: f32,
    /// Cost of the turn onto this edge from the predecessor
    pub transition_cost: Cost,
    /// Cost of traversing the whole edge
    pub edge_cost: Cost,
    pub edge_length: f32,
    /// Share of the edge covered by this label: 1.0 except for seeds
    pub fraction: f32,
    pub direction: Direction,
    /// Restriction mask copied from the edge
    pub restrictions: u32,
    pub time: Option<TimeInfo>,
    /// Index of the location this label's chain starts at
    pub origin: u32,
    /// Set once the chain has left a not-thru region
    pub not_thru_pruning: bool,
    pub status: LabelStatus,
}

impl EdgeLabel {
    pub fn is_origin(&self) -> bool {
        self.predecessor == NO_PREDECESSOR
    }

    pub fn predecessor(&self) -> Option<u32> {
        (!self.is_origin()).then_some(self.predecessor)
    }

    /// Cost accumulated before entering the covered share of this edge
    pub fn cost_at_entry(&self) -> Cost {
        self.cost - self.edge_cost.scale(self.fraction)
    }

    pub fn distance_at_entry(&self) -> f32 {
        self.distance - self.edge_length * self.fraction
    }
}

/// Entry of the edge status table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeStatus {
    pub index: u32,
    pub status: LabelStatus,
}

/// Outcome of offering a label to the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allocation {
    Inserted(u32),
    /// An existing temporary label was improved in place
    Updated { index: u32, previous_sort_cost: f32 },
    /// The edge already has an equal-or-better or a permanent label
    Rejected,
}

#[derive(Debug, Clone)]
pub struct LabelStore {
    direction: Direction,
    labels: Vec<EdgeLabel>,
    status: FxHashMap<GraphId, EdgeStatus>,
}

impl LabelStore {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            labels: Vec::new(),
            status: FxHashMap::default(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at a slot handed out by this store
    pub fn label(&self, index: u32) -> &EdgeLabel {
        &self.labels[index as usize]
    }

    pub fn find(&self, edge: GraphId) -> Option<EdgeStatus> {
        self.status.get(&edge).copied()
    }

    pub fn status(&self, edge: GraphId) -> LabelStatus {
        self.find(edge).map_or(LabelStatus::Unreached, |s| s.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &EdgeLabel)> + '_ {
        self.labels.iter().enumerate().map(|(i, l)| (i as u32, l))
    }

    pub fn allocate(&mut self, mut label: EdgeLabel) -> Allocation {
        match self.status.get(&label.edge_id).copied() {
            None => {
                let index = self.labels.len() as u32;
                label.status = LabelStatus::Temporary;
                self.labels.push(label);
                self.status.insert(
                    label.edge_id,
                    EdgeStatus {
                        index,
                        status: LabelStatus::Temporary,
                    },
                );
                Allocation::Inserted(index)
            }
            Some(EdgeStatus {
                status: LabelStatus::Temporary,
                index,
            }) => {
                let previous_sort_cost = self.labels[index as usize].sort_cost;
                if label.sort_cost < previous_sort_cost && self.update(index, label) {
                    Allocation::Updated {
                        index,
                        previous_sort_cost,
                    }
                } else {
                    Allocation::Rejected
                }
            }
            Some(_) => Allocation::Rejected,
        }
    }

    /// Replace a temporary label. Returns false (and changes nothing) once
    /// the label is permanent.
    pub fn update(&mut self, index: u32, mut label: EdgeLabel) -> bool {
        let slot = &mut self.labels[index as usize];
        if slot.status != LabelStatus::Temporary || slot.edge_id != label.edge_id {
            return false;
        }
        label.status = LabelStatus::Temporary;
        *slot = label;
        true
    }

    pub fn mark_permanent(&mut self, index: u32) {
        let label = &mut self.labels[index as usize];
        label.status = LabelStatus::Permanent;
        if let Some(entry) = self.status.get_mut(&label.edge_id) {
            entry.status = LabelStatus::Permanent;
        }
    }
}
