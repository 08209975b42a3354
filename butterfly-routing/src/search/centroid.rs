//! Meeting point of several locations
//!
//! One forward expansion per location, interleaved by always advancing the
//! one with the smallest queue front. An edge settled by every expansion is
//! a candidate meeting point priced at the sum of the per-location costs.
//! Once no queue front is below the best candidate, nothing can beat it.

use butterfly_common::{GraphId, LatLng};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use super::expansion::{ExpansionEngine, Step};
use super::path::{forward_edges, Route};
use crate::costing::{Cost, Costing};
use crate::error::{Result, SearchError};
use crate::graph::{Direction, GraphReader};
use crate::location::{validate_all, Location};
use crate::options::SearchOptions;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Centroid {
    /// Edge where everyone meets, at its end node
    pub edge: GraphId,
    pub position: LatLng,
    /// Sum of the per-location costs
    pub cost: f32,
    pub costs: Vec<Cost>,
    /// One route per location, in input order
    pub routes: Vec<Route>,
}

pub fn centroid<G, C>(graph: &G, costing: &C, locations: &[Location], options: &SearchOptions) -> Result<Centroid>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    validate_all(locations, "locations")?;
    options.validate()?;
    let limits = options.limits();
    let time = options.time_info();
    let n = locations.len();

    let mut engines = locations
        .iter()
        .enumerate()
        .map(|(i, location)| {
            let mut engine = ExpansionEngine::new(graph, costing, Direction::Forward, options, limits);
            engine.seed(location, i as u32, time)?;
            Ok(engine)
        })
        .collect::<Result<Vec<_>>>()?;

    // edge -> settled label index per location
    let mut visits: FxHashMap<GraphId, Vec<Option<u32>>> = FxHashMap::default();
    let mut best: Option<(GraphId, f32)> = None;

    loop {
        let mut next: Option<(usize, f32)> = None;
        for (i, engine) in engines.iter_mut().enumerate() {
            if let Some(key) = engine.peek_key() {
                if next.map_or(true, |(_, k)| key < k) {
                    next = Some((i, key));
                }
            }
        }
        let Some((i, key)) = next else {
            break;
        };
        if best.is_some_and(|(_, cost)| key >= cost) {
            break;
        }

        let Step::Settled(index) = engines[i].next()? else {
            continue;
        };
        let edge = engines[i].label(index).edge_id;
        let slots = visits.entry(edge).or_insert_with(|| vec![None; n]);
        slots[i] = Some(index);
        let total = slots
            .iter()
            .zip(&engines)
            .map(|(slot, engine)| slot.map(|idx| engine.label(idx).cost.cost))
            .sum::<Option<f32>>();
        if let Some(total) = total {
            if best.map_or(true, |(_, cost)| total < cost) {
                best = Some((edge, total));
            }
        }
    }

    let settled: usize = engines.iter().map(|e| e.stats().settled).sum();
    let Some((edge, cost)) = best else {
        debug!(locations = n, settled, elapsed_ms = limits.elapsed_ms(), "no common meeting point");
        return Err(SearchError::NoCommonMeetingPoint(n));
    };

    let slots = visits.get(&edge).map(Vec::as_slice).unwrap_or_default();
    let mut costs = Vec::with_capacity(n);
    let mut routes = Vec::with_capacity(n);
    for (slot, engine) in slots.iter().zip(&engines) {
        let Some(index) = *slot else {
            return Err(SearchError::NoCommonMeetingPoint(n));
        };
        let label = engine.label(index);
        costs.push(label.cost);
        routes.push(Route {
            edges: forward_edges(engine.labels(), index),
            cost: label.cost,
            distance: label.distance,
        });
    }
    let position = graph.node(graph.edge(edge)?.end_node)?.position;

    debug!(
        locations = n,
        %edge,
        cost,
        settled,
        elapsed_ms = limits.elapsed_ms(),
        "centroid"
    );
    Ok(Centroid {
        edge,
        position,
        cost,
        costs,
        routes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fixtures;

    #[test]
    fn test_meets_between_two_ends() {
        // 1 - 2 - 3 - 4 - 5, both ways
        let graph = fixtures::graph(&fixtures::line(1, 5, 2.0), false);
        let costing = fixtures::costing();
        let node = |n| graph.node_id(n).unwrap();
        let locations = vec![graph.origin_at(node(1)).unwrap(), graph.origin_at(node(5)).unwrap()];
        let c = centroid(&graph, &costing, &locations, &fixtures::options()).unwrap();

        assert_eq!(c.costs.len(), 2);
        assert_eq!(c.routes.len(), 2);
        let sum: f32 = c.costs.iter().map(|k| k.cost).sum();
        assert_eq!(sum, c.cost);
        // the ends are 8 apart and both sides also pay for the meeting edge
        assert_eq!(c.cost, 12.0);
        for (route, cost) in c.routes.iter().zip(&c.costs) {
            assert_eq!(route.edges.last().unwrap().edge, c.edge);
            assert_eq!(route.cost, *cost);
        }
    }

    #[test]
    fn test_single_location_meets_itself() {
        let graph = fixtures::graph(&fixtures::line(1, 3, 2.0), true);
        let costing = fixtures::costing();
        let locations = vec![graph.origin_at(graph.node_id(1).unwrap()).unwrap()];
        let c = centroid(&graph, &costing, &locations, &fixtures::options()).unwrap();
        assert_eq!(c.edge, graph.edge_between(1, 2).unwrap());
        assert_eq!(c.cost, 2.0);
    }

    #[test]
    fn test_disconnected_locations() {
        let graph = fixtures::graph(&[(1, 2, 2.0), (3, 4, 2.0)], false);
        let costing = fixtures::costing();
        let node = |n| graph.node_id(n).unwrap();
        let locations = vec![graph.origin_at(node(1)).unwrap(), graph.origin_at(node(3)).unwrap()];
        let err = centroid(&graph, &costing, &locations, &fixtures::options()).unwrap_err();
        assert_eq!(err, SearchError::NoCommonMeetingPoint(2));
    }

    #[test]
    fn test_no_locations() {
        let graph = fixtures::graph(&[(1, 2, 2.0)], false);
        let costing = fixtures::costing();
        let err = centroid(&graph, &costing, &[], &fixtures::options()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
    }
}
