//! Path reconstruction from predecessor chains

use butterfly_common::GraphId;
use serde::Serialize;

use super::label::{EdgeLabel, LabelStore};
use super::targets::TargetHit;
use crate::costing::{Cost, Costing};
use crate::error::{Result, SearchError};
use crate::graph::{Direction, GraphReader};

/// One edge of a route with the cost and distance elapsed at its end (or at
/// the destination, for the last edge)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteEdge {
    pub edge: GraphId,
    pub elapsed_cost: f32,
    pub elapsed_secs: f32,
    pub elapsed_distance: f32,
}

impl RouteEdge {
    fn new(edge: GraphId, elapsed: Cost, elapsed_distance: f32) -> Self {
        Self {
            edge,
            elapsed_cost: elapsed.cost,
            elapsed_secs: elapsed.secs,
            elapsed_distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Edges in travel order, from the origin's edge to the destination's
    pub edges: Vec<RouteEdge>,
    pub cost: Cost,
    pub distance: f32,
}

impl Route {
    pub fn edge_ids(&self) -> Vec<GraphId> {
        self.edges.iter().map(|e| e.edge).collect()
    }
}

/// Labels from `terminal` back to its origin, terminal first
fn chain(labels: &LabelStore, terminal: u32) -> impl Iterator<Item = &EdgeLabel> + '_ {
    let mut next = Some(terminal);
    std::iter::from_fn(move || {
        let index = next?;
        let label = labels.label(index);
        next = label.predecessor();
        Some(label)
    })
}

/// Forward chain in travel order. Elapsed values are the labels' own.
pub fn forward_edges(labels: &LabelStore, terminal: u32) -> Vec<RouteEdge> {
    let mut edges: Vec<RouteEdge> = chain(labels, terminal)
        .map(|l| RouteEdge::new(l.edge_id, l.cost, l.distance))
        .collect();
    edges.reverse();
    edges
}

/// Reverse chain from `start` (nearest the meeting point) to the
/// destination, already in travel order. A reverse label holds the cost from
/// the start of its covered span to the destination, so the elapsed value at
/// the end of the edge is the total minus what remains after it.
pub fn reverse_edges(labels: &LabelStore, start: u32, total: Cost, total_distance: f32) -> Vec<RouteEdge> {
    chain(labels, start)
        .map(|l| {
            RouteEdge::new(
                l.edge_id,
                total - l.cost_at_entry(),
                total_distance - l.distance_at_entry(),
            )
        })
        .collect()
}

/// Route through a connection of two searches that both hold a label on the
/// same edge
pub fn bidirectional_route(
    forward: &LabelStore,
    reverse: &LabelStore,
    forward_index: u32,
    reverse_index: u32,
    cost: Cost,
    distance: f32,
) -> Route {
    let mut edges = forward_edges(forward, forward_index);
    // the connection edge comes from the reverse side, which knows where the
    // route ends on it
    edges.pop();
    edges.extend(reverse_edges(reverse, reverse_index, cost, distance));
    Route {
        edges,
        cost,
        distance,
    }
}

/// Route of a one-to-many target hit
pub fn target_route(labels: &LabelStore, hit: &TargetHit) -> Route {
    let mut edges = match (labels.direction(), hit.predecessor) {
        (_, None) => Vec::new(),
        (Direction::Forward, Some(pred)) => forward_edges(labels, pred),
        (Direction::Reverse, Some(pred)) => {
            // hit.edge is the origin's edge; it ends where `pred` begins
            let mut first = vec![RouteEdge::new(
                hit.edge,
                hit.cost - hit.cost_before,
                hit.distance - labels.label(pred).distance,
            )];
            first.extend(reverse_edges(labels, pred, hit.cost, hit.distance));
            return Route {
                edges: first,
                cost: hit.cost,
                distance: hit.distance,
            };
        }
    };
    edges.push(RouteEdge::new(hit.edge, hit.cost, hit.distance));
    Route {
        edges,
        cost: hit.cost,
        distance: hit.distance,
    }
}

/// Price a route edge by edge with the costing, covering `first_share` of
/// the first edge (from its end) and `last_share` of the last (from its
/// start); a single-edge route covers `last_share - (1 - first_share)`.
pub fn recost<G, C>(graph: &G, costing: &C, edges: &[GraphId], first_share: f32, last_share: f32) -> Result<Cost>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    let Some((&first, rest)) = edges.split_first() else {
        return Ok(Cost::ZERO);
    };
    let forbidden = |what: String| SearchError::InvalidRequest(format!("route uses forbidden {what}"));

    let first_attrs = graph.edge(first)?;
    let first_cost = costing
        .edge_cost(&first_attrs, None)
        .ok_or_else(|| forbidden(format!("edge {first}")))?;
    if rest.is_empty() {
        return Ok(first_cost.scale(last_share - (1.0 - first_share)));
    }

    let mut total = first_cost.scale(first_share);
    let mut prev = first_attrs;
    let mut transitions = Vec::new();
    for (i, &edge) in rest.iter().enumerate() {
        transitions.clear();
        graph.transitions(prev.id, Direction::Forward, &mut transitions)?;
        let turn = transitions
            .iter()
            .find(|t| t.edge == edge)
            .ok_or_else(|| SearchError::InvalidRequest(format!("edges {} and {edge} are not connected", prev.id)))?;
        let attrs = graph.edge(edge)?;
        total += costing
            .transition_cost(&prev, &attrs, &turn.turn)
            .ok_or_else(|| forbidden(format!("turn {} -> {edge}", prev.id)))?;
        let edge_cost = costing
            .edge_cost(&attrs, None)
            .ok_or_else(|| forbidden(format!("edge {edge}")))?;
        let share = if i + 1 == rest.len() { last_share } else { 1.0 };
        total += edge_cost.scale(share);
        prev = attrs;
    }
    Ok(total)
}
