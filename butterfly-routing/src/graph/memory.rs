//! In-memory tiled graph built from a JSON description
//!
//! Nodes live on the local level; edges on the level given in the
//! description. Every object gets a `GraphId` in the tile containing it (the
//! start node for edges), numbered in insertion order within the tile.

use butterfly_common::graph_id::MAX_INDEX;
use butterfly_common::{geo::turn_angle, GraphError, GraphId, LatLng, TileHierarchy};
use rstar::{primitives::GeomWithData, RTree};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{access, Direction, EdgeAttributes, GraphReader, NodeAttributes, Transition, TurnContext};
use crate::location::Location;

fn default_speed() -> f32 {
    50.0
}

fn default_level() -> u8 {
    2
}

fn default_access() -> u8 {
    access::ALL
}

/// Graph description as read from JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub restrictions: Vec<RestrictionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub signal: bool,
}

impl NodeSpec {
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            signal: false,
        }
    }
}

/// A road between two nodes. Two-way unless `oneway` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: u64,
    pub to: u64,
    /// Meters; defaults to the great-circle distance between the nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f32>,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congested_speed: Option<f32>,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default = "default_access")]
    pub access: u8,
    #[serde(default)]
    pub oneway: bool,
    #[serde(default)]
    pub not_thru: bool,
}

impl EdgeSpec {
    pub fn new(from: u64, to: u64) -> Self {
        Self {
            from,
            to,
            length: None,
            speed: default_speed(),
            congested_speed: None,
            level: default_level(),
            access: default_access(),
            oneway: false,
            not_thru: false,
        }
    }

    pub fn length(mut self, meters: f32) -> Self {
        self.length = Some(meters);
        self
    }

    pub fn speed(mut self, kph: f32) -> Self {
        self.speed = kph;
        self
    }

    pub fn oneway(mut self) -> Self {
        self.oneway = true;
        self
    }

    pub fn level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }
}

/// No turn from the road `from -> via` onto the road `via -> to`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RestrictionSpec {
    pub from: u64,
    pub via: u64,
    pub to: u64,
}

#[derive(Debug, Error)]
pub enum GraphSpecError {
    #[error("duplicate node {0}")]
    DuplicateNode(u64),

    #[error("edge {from}->{to} references unknown node {node}")]
    UnknownNode { from: u64, to: u64, node: u64 },

    #[error("edge {from}->{to}: {reason}")]
    InvalidEdge { from: u64, to: u64, reason: String },

    #[error("restriction {from}->{via}->{to}: {reason}")]
    InvalidRestriction {
        from: u64,
        via: u64,
        to: u64,
        reason: String,
    },

    #[error("tile {tile} on level {level} is full")]
    TileFull { level: u8, tile: u32 },

    #[error("invalid graph json: {0}")]
    Json(#[from] serde_json::Error),
}

struct NodeRecord {
    attrs: NodeAttributes,
    external: u64,
    outbound: Vec<u32>,
    inbound: Vec<u32>,
}

struct EdgeRecord {
    attrs: EdgeAttributes,
    local_index: u8,
    bearing: f64,
    from: u32,
    to: u32,
}

pub struct MemoryGraph {
    hierarchy: TileHierarchy,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    node_index: FxHashMap<GraphId, u32>,
    edge_index: FxHashMap<GraphId, u32>,
    external_nodes: FxHashMap<u64, u32>,
    unavailable: FxHashSet<GraphId>,
    rtree: RTree<GeomWithData<[f64; 2], u32>>,
}

/// Hands out object indices per (level, tile)
#[derive(Default)]
struct TileCounters(FxHashMap<(u8, u32), u32>);

impl TileCounters {
    fn next(&mut self, level: u8, tile: u32) -> Result<GraphId, GraphSpecError> {
        let counter = self.0.entry((level, tile)).or_insert(0);
        if *counter > MAX_INDEX {
            return Err(GraphSpecError::TileFull { level, tile });
        }
        let id = GraphId::new(level, tile, *counter);
        *counter += 1;
        Ok(id)
    }
}

impl MemoryGraph {
    pub fn from_json(json: &str) -> Result<Self, GraphSpecError> {
        let spec: GraphSpec = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &GraphSpec) -> Result<Self, GraphSpecError> {
        Self::with_hierarchy(spec, TileHierarchy::default())
    }

    pub fn with_hierarchy(spec: &GraphSpec, hierarchy: TileHierarchy) -> Result<Self, GraphSpecError> {
        let mut counters = TileCounters::default();
        let local_level = hierarchy.local_level();

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        let mut node_index = FxHashMap::default();
        let mut external_nodes = FxHashMap::default();
        for n in &spec.nodes {
            let position = LatLng::new(n.lat, n.lon);
            let tile = hierarchy
                .tile_id(local_level, position)
                .map(|t| t.tile())
                .unwrap_or(0);
            let id = counters.next(local_level, tile)?;
            let idx = nodes.len() as u32;
            if external_nodes.insert(n.id, idx).is_some() {
                return Err(GraphSpecError::DuplicateNode(n.id));
            }
            node_index.insert(id, idx);
            nodes.push(NodeRecord {
                attrs: NodeAttributes {
                    id,
                    position,
                    has_signal: n.signal,
                    degree: 0,
                },
                external: n.id,
                outbound: Vec::new(),
                inbound: Vec::new(),
            });
        }

        let mut edges: Vec<EdgeRecord> = Vec::with_capacity(spec.edges.len() * 2);
        let mut edge_index = FxHashMap::default();
        for e in &spec.edges {
            let lookup = |node: u64| {
                external_nodes
                    .get(&node)
                    .copied()
                    .ok_or(GraphSpecError::UnknownNode {
                        from: e.from,
                        to: e.to,
                        node,
                    })
            };
            let from = lookup(e.from)?;
            let to = lookup(e.to)?;
            validate_edge(e, &hierarchy)?;

            let mut directed = vec![(from, to)];
            if !e.oneway {
                directed.push((to, from));
            }
            for (a, b) in directed {
                let start = nodes[a as usize].attrs;
                let end = nodes[b as usize].attrs;
                let level = e.level;
                let tile = hierarchy
                    .tile_id(level, start.position)
                    .map(|t| t.tile())
                    .unwrap_or(0);
                let id = counters.next(level, tile)?;
                let length_m = e
                    .length
                    .unwrap_or_else(|| start.position.distance_to(&end.position) as f32);
                let local_index = nodes[a as usize].outbound.len().min(u8::MAX as usize) as u8;

                let idx = edges.len() as u32;
                edge_index.insert(id, idx);
                edges.push(EdgeRecord {
                    attrs: EdgeAttributes {
                        id,
                        start_node: start.id,
                        end_node: end.id,
                        length_m,
                        speed_kph: e.speed,
                        congested_speed_kph: e.congested_speed,
                        access: e.access,
                        restrictions: 0,
                        not_thru: e.not_thru,
                    },
                    local_index,
                    bearing: start.position.bearing_to(&end.position),
                    from: a,
                    to: b,
                });
                nodes[a as usize].outbound.push(idx);
                nodes[b as usize].inbound.push(idx);
            }
        }

        for node in nodes.iter_mut() {
            let neighbours: FxHashSet<u32> = node
                .outbound
                .iter()
                .map(|&e| edges[e as usize].to)
                .chain(node.inbound.iter().map(|&e| edges[e as usize].from))
                .collect();
            node.attrs.degree = neighbours.len().min(u8::MAX as usize) as u8;
        }

        for r in &spec.restrictions {
            apply_restriction(r, &external_nodes, &nodes, &mut edges)?;
        }

        let points = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| GeomWithData::new([n.attrs.position.lon, n.attrs.position.lat], i as u32))
            .collect();

        Ok(Self {
            hierarchy,
            nodes,
            edges,
            node_index,
            edge_index,
            external_nodes,
            unavailable: FxHashSet::default(),
            rtree: RTree::bulk_load(points),
        })
    }

    pub fn hierarchy(&self) -> &TileHierarchy {
        &self.hierarchy
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeAttributes> + '_ {
        self.edges.iter().map(|e| &e.attrs)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeAttributes> + '_ {
        self.nodes.iter().map(|n| &n.attrs)
    }

    pub fn node_id(&self, external: u64) -> Option<GraphId> {
        self.external_nodes
            .get(&external)
            .map(|&i| self.nodes[i as usize].attrs.id)
    }

    pub fn external_node(&self, id: GraphId) -> Option<u64> {
        self.node_index
            .get(&id)
            .map(|&i| self.nodes[i as usize].external)
    }

    /// First directed edge `from -> to` between two described nodes
    pub fn edge_between(&self, from: u64, to: u64) -> Option<GraphId> {
        let a = *self.external_nodes.get(&from)?;
        let b = *self.external_nodes.get(&to)?;
        self.nodes[a as usize]
            .outbound
            .iter()
            .map(|&e| &self.edges[e as usize])
            .find(|e| e.to == b)
            .map(|e| e.attrs.id)
    }

    /// External ids of an edge's end points
    pub fn edge_nodes(&self, edge: GraphId) -> Option<(u64, u64)> {
        let rec = &self.edges[*self.edge_index.get(&edge)? as usize];
        Some((
            self.nodes[rec.from as usize].external,
            self.nodes[rec.to as usize].external,
        ))
    }

    /// Make every read of the tile containing `tile` fail (or succeed again)
    pub fn set_tile_available(&mut self, tile: GraphId, available: bool) {
        if available {
            self.unavailable.remove(&tile.tile_base());
        } else {
            self.unavailable.insert(tile.tile_base());
        }
    }

    pub fn nearest_node(&self, position: LatLng) -> Option<GraphId> {
        self.rtree
            .nearest_neighbor(&[position.lon, position.lat])
            .map(|p| self.nodes[p.data as usize].attrs.id)
    }

    /// Location at a node for leaving it: every outbound edge at 0 %
    pub fn origin_at(&self, node: GraphId) -> Option<Location> {
        let rec = &self.nodes[*self.node_index.get(&node)? as usize];
        if rec.outbound.is_empty() {
            return None;
        }
        let mut loc = Location::new(rec.attrs.position);
        for &e in &rec.outbound {
            loc = loc.with_candidate(self.edges[e as usize].attrs.id, 0.0);
        }
        Some(loc)
    }

    /// Location at a node for arriving at it: every inbound edge at 100 %
    pub fn destination_at(&self, node: GraphId) -> Option<Location> {
        let rec = &self.nodes[*self.node_index.get(&node)? as usize];
        if rec.inbound.is_empty() {
            return None;
        }
        let mut loc = Location::new(rec.attrs.position);
        for &e in &rec.inbound {
            loc = loc.with_candidate(self.edges[e as usize].attrs.id, 1.0);
        }
        Some(loc)
    }

    /// Location part way along a single edge
    pub fn location_on_edge(&self, edge: GraphId, percent_along: f32) -> Option<Location> {
        let rec = &self.edges[*self.edge_index.get(&edge)? as usize];
        let start = self.nodes[rec.from as usize].attrs.position;
        let end = self.nodes[rec.to as usize].attrs.position;
        let position = start.lerp(&end, percent_along as f64);
        Some(Location::new(position).with_candidate(edge, percent_along))
    }

    fn check_tile(&self, id: GraphId) -> Result<(), GraphError> {
        if self.unavailable.contains(&id.tile_base()) {
            return Err(GraphError::TileUnavailable(id));
        }
        Ok(())
    }

    fn edge_record(&self, id: GraphId) -> Result<&EdgeRecord, GraphError> {
        self.check_tile(id)?;
        self.edge_index
            .get(&id)
            .map(|&i| &self.edges[i as usize])
            .ok_or(GraphError::UnknownEdge(id))
    }

    fn node_record(&self, index: u32) -> Result<&NodeRecord, GraphError> {
        let rec = &self.nodes[index as usize];
        self.check_tile(rec.attrs.id)?;
        Ok(rec)
    }
}

fn validate_edge(e: &EdgeSpec, hierarchy: &TileHierarchy) -> Result<(), GraphSpecError> {
    let invalid = |reason: String| GraphSpecError::InvalidEdge {
        from: e.from,
        to: e.to,
        reason,
    };
    if e.from == e.to {
        return Err(invalid("self loops are not supported".into()));
    }
    if hierarchy.level(e.level).is_none() {
        return Err(invalid(format!("unknown hierarchy level {}", e.level)));
    }
    if !(e.speed.is_finite() && e.speed > 0.0) {
        return Err(invalid(format!("speed must be positive, got {}", e.speed)));
    }
    if let Some(len) = e.length {
        if !(len.is_finite() && len >= 0.0) {
            return Err(invalid(format!("length must not be negative, got {len}")));
        }
    }
    if let Some(s) = e.congested_speed {
        if !(s.is_finite() && s > 0.0) {
            return Err(invalid(format!("congested speed must be positive, got {s}")));
        }
    }
    Ok(())
}

fn apply_restriction(
    r: &RestrictionSpec,
    external_nodes: &FxHashMap<u64, u32>,
    nodes: &[NodeRecord],
    edges: &mut [EdgeRecord],
) -> Result<(), GraphSpecError> {
    let invalid = |reason: &str| GraphSpecError::InvalidRestriction {
        from: r.from,
        via: r.via,
        to: r.to,
        reason: reason.to_string(),
    };
    let (Some(&a), Some(&v), Some(&b)) = (
        external_nodes.get(&r.from),
        external_nodes.get(&r.via),
        external_nodes.get(&r.to),
    ) else {
        return Err(invalid("unknown node"));
    };

    let via = &nodes[v as usize];
    let inbound: Vec<u32> = via
        .inbound
        .iter()
        .copied()
        .filter(|&e| edges[e as usize].from == a)
        .collect();
    let outbound: Vec<u32> = via
        .outbound
        .iter()
        .copied()
        .filter(|&e| edges[e as usize].to == b)
        .collect();
    if inbound.is_empty() || outbound.is_empty() {
        return Err(invalid("no such turn"));
    }

    for &out in &outbound {
        let local = edges[out as usize].local_index;
        if local >= 32 {
            return Err(invalid("outbound edge index beyond the restriction mask"));
        }
        for &inc in &inbound {
            edges[inc as usize].attrs.restrictions |= 1 << local;
        }
    }
    Ok(())
}

impl GraphReader for MemoryGraph {
    fn edge(&self, id: GraphId) -> Result<EdgeAttributes, GraphError> {
        self.edge_record(id).map(|r| r.attrs)
    }

    fn node(&self, id: GraphId) -> Result<NodeAttributes, GraphError> {
        self.check_tile(id)?;
        self.node_index
            .get(&id)
            .map(|&i| self.nodes[i as usize].attrs)
            .ok_or(GraphError::UnknownNode(id))
    }

    fn transitions(
        &self,
        edge: GraphId,
        direction: Direction,
        out: &mut Vec<Transition>,
    ) -> Result<(), GraphError> {
        let rec = self.edge_record(edge)?;
        match direction {
            Direction::Forward => {
                let via = self.node_record(rec.to)?;
                for &o in &via.outbound {
                    let next = &self.edges[o as usize];
                    self.check_tile(next.attrs.id)?;
                    out.push(Transition {
                        edge: next.attrs.id,
                        turn: TurnContext {
                            node: via.attrs.id,
                            local_index: next.local_index,
                            turn_degree: turn_angle(rec.bearing, next.bearing).round() as i16,
                            node_degree: via.attrs.degree,
                            has_signal: via.attrs.has_signal,
                        },
                    });
                }
            }
            Direction::Reverse => {
                let via = self.node_record(rec.from)?;
                for &i in &via.inbound {
                    let prev = &self.edges[i as usize];
                    self.check_tile(prev.attrs.id)?;
                    out.push(Transition {
                        edge: prev.attrs.id,
                        turn: TurnContext {
                            node: via.attrs.id,
                            local_index: rec.local_index,
                            turn_degree: turn_angle(prev.bearing, rec.bearing).round() as i16,
                            node_degree: via.attrs.degree,
                            has_signal: via.attrs.has_signal,
                        },
                    });
                }
            }
        }
        Ok(())
    }
}
