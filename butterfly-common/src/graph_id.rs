//! Hierarchical graph identifiers
//!
//! A `GraphId` packs three fields into the low 46 bits of a `u64`:
//!
//! | bits   | field | range |
//! |--------|-------|-------|
//! | 0..3   | hierarchy level | 0..=7 |
//! | 3..25  | tile index within the level | 0..2^22 |
//! | 25..46 | object index within the tile | 0..2^21 |
//!
//! Ordering follows the packed value, so ids sort by (index, tile, level).
//! Only equality and hashing carry meaning for the search; the order is there
//! so ids can key ordered maps deterministically.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::LatLng;

const LEVEL_BITS: u64 = 3;
const TILE_BITS: u64 = 22;
const INDEX_BITS: u64 = 21;

const LEVEL_MASK: u64 = (1 << LEVEL_BITS) - 1;
const TILE_MASK: u64 = (1 << TILE_BITS) - 1;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

const INVALID: u64 = (1 << (LEVEL_BITS + TILE_BITS + INDEX_BITS)) - 1;

pub const MAX_LEVEL: u8 = LEVEL_MASK as u8;
pub const MAX_TILE: u32 = TILE_MASK as u32;
pub const MAX_INDEX: u32 = INDEX_MASK as u32;

/// Identifier of a node or directed edge in the tiled graph
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(u64);

impl GraphId {
    pub const INVALID: GraphId = GraphId(INVALID);

    /// Build an id from its parts. Out-of-range parts are masked.
    pub fn new(level: u8, tile: u32, index: u32) -> Self {
        GraphId(
            (level as u64 & LEVEL_MASK)
                | ((tile as u64 & TILE_MASK) << LEVEL_BITS)
                | ((index as u64 & INDEX_MASK) << (LEVEL_BITS + TILE_BITS)),
        )
    }

    pub fn from_raw(value: u64) -> Self {
        GraphId(value & INVALID)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn level(self) -> u8 {
        (self.0 & LEVEL_MASK) as u8
    }

    pub fn tile(self) -> u32 {
        ((self.0 >> LEVEL_BITS) & TILE_MASK) as u32
    }

    pub fn index(self) -> u32 {
        ((self.0 >> (LEVEL_BITS + TILE_BITS)) & INDEX_MASK) as u32
    }

    /// Id of the tile containing this object (object index zeroed)
    pub fn tile_base(self) -> GraphId {
        GraphId(self.0 & (LEVEL_MASK | (TILE_MASK << LEVEL_BITS)))
    }

    pub fn is_valid(self) -> bool {
        self.0 != INVALID
    }
}

impl Default for GraphId {
    fn default() -> Self {
        GraphId::INVALID
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}/{}/{}", self.level(), self.tile(), self.index())
        } else {
            write!(f, "invalid")
        }
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({self})")
    }
}

/// Tile grid of one hierarchy level: square tiles of `size_deg` degrees
/// covering the whole globe, numbered row-major from (-90, -180).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileLevel {
    pub level: u8,
    pub size_deg: f64,
}

impl TileLevel {
    pub fn columns(&self) -> u32 {
        (360.0 / self.size_deg).round() as u32
    }

    pub fn rows(&self) -> u32 {
        (180.0 / self.size_deg).round() as u32
    }

    pub fn tile_count(&self) -> u32 {
        self.columns() * self.rows()
    }

    /// Tile containing a coordinate. Coordinates on the upper edges of the
    /// globe are clamped into the last row/column.
    pub fn tile_for(&self, position: LatLng) -> u32 {
        let col = ((position.lon + 180.0) / self.size_deg).floor() as i64;
        let row = ((position.lat + 90.0) / self.size_deg).floor() as i64;
        let col = col.clamp(0, self.columns() as i64 - 1) as u32;
        let row = row.clamp(0, self.rows() as i64 - 1) as u32;
        row * self.columns() + col
    }

    /// South-west corner of a tile
    pub fn tile_origin(&self, tile: u32) -> LatLng {
        let row = tile / self.columns();
        let col = tile % self.columns();
        LatLng::new(
            row as f64 * self.size_deg - 90.0,
            col as f64 * self.size_deg - 180.0,
        )
    }
}

/// The three-level road hierarchy: highways on 4° tiles, arterials on 1°
/// tiles, local roads on 0.25° tiles.
#[derive(Debug, Clone)]
pub struct TileHierarchy {
    levels: Vec<TileLevel>,
}

impl Default for TileHierarchy {
    fn default() -> Self {
        Self {
            levels: vec![
                TileLevel { level: 0, size_deg: 4.0 },
                TileLevel { level: 1, size_deg: 1.0 },
                TileLevel { level: 2, size_deg: 0.25 },
            ],
        }
    }
}

impl TileHierarchy {
    pub fn levels(&self) -> &[TileLevel] {
        &self.levels
    }

    pub fn level(&self, level: u8) -> Option<&TileLevel> {
        self.levels.iter().find(|l| l.level == level)
    }

    pub fn local_level(&self) -> u8 {
        self.levels.last().map(|l| l.level).unwrap_or(0)
    }

    /// Tile id (object index 0) of a coordinate on a level
    pub fn tile_id(&self, level: u8, position: LatLng) -> Option<GraphId> {
        self.level(level)
            .map(|l| GraphId::new(level, l.tile_for(position), 0))
    }
}
