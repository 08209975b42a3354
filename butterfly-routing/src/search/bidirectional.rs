//! Bidirectional point-to-point search
//!
//! A forward expansion from the origin and a reverse expansion from the
//! destination take turns, always advancing the side with the smaller queue
//! front. Every label either side creates or settles is checked against the
//! other side's store; the cheapest pair found so far is the candidate route.
//!
//! The search stops once the candidate cannot be beaten:
//! - without a heuristic, when its cost is at most the sum of both queue fronts
//! - with A*, when its cost is at most the larger of the two fronts
//! - when either side runs dry
//!
//! Both sides prune not-thru edges: once a side has left a not-thru region
//! it does not enter another one. Each end can still start or finish inside
//! one, but a route never cuts through a region between them. The one-sided
//! searches behind `route_unidirectional` and `cost_matrix` cannot tell the
//! far end's region apart and do not prune, so they may return a cheaper
//! cost through such a region.

use tracing::debug;

use super::expansion::{ExpansionEngine, Step};
use super::path::{bidirectional_route, Route};
use crate::costing::{Cost, Costing};
use crate::error::{Result, SearchError};
use crate::graph::{Direction, GraphReader};
use crate::location::Location;
use crate::options::SearchOptions;

/// Share sums below one by more than this leave a gap on the meeting edge
const FRACTION_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Connection {
    forward: u32,
    reverse: u32,
    cost: Cost,
    distance: f32,
}

pub fn route_bidirectional<G, C>(
    graph: &G,
    costing: &C,
    origin: &Location,
    destination: &Location,
    options: &SearchOptions,
) -> Result<Route>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    origin.validate()?;
    destination.validate()?;
    options.validate()?;
    let limits = options.limits();
    let heuristic = options.use_heuristic;

    let mut forward =
        ExpansionEngine::new(graph, costing, Direction::Forward, options, limits).with_not_thru_pruning();
    let mut reverse =
        ExpansionEngine::new(graph, costing, Direction::Reverse, options, limits).with_not_thru_pruning();
    if heuristic {
        forward = forward.with_heuristic(destination.position);
        reverse = reverse.with_heuristic(origin.position);
    }

    let mut best: Option<Connection> = None;
    forward.seed(origin, 0, None)?;
    reverse.seed(destination, 0, None)?;
    for &index in forward.relaxed() {
        connect(&forward, &reverse, index, &mut best);
    }
    for &index in reverse.relaxed() {
        connect(&reverse, &forward, index, &mut best);
    }

    loop {
        let (Some(kf), Some(kr)) = (forward.peek_key(), reverse.peek_key()) else {
            break;
        };
        if let Some(c) = &best {
            let bound = if heuristic { kf.max(kr) } else { kf + kr };
            if c.cost.cost <= bound {
                break;
            }
        }

        let (this, other) = if kf <= kr {
            (&mut forward, &reverse)
        } else {
            (&mut reverse, &forward)
        };
        match this.next()? {
            Step::Settled(index) => {
                connect(this, other, index, &mut best);
                for &relaxed in this.relaxed() {
                    connect(this, other, relaxed, &mut best);
                }
            }
            Step::Converged | Step::Exhausted => break,
        }
    }

    let settled = (forward.stats().settled, reverse.stats().settled);
    let best = best.filter(|c| limits.admits(c.cost.cost, c.distance));
    let Some(c) = best else {
        debug!(
            settled_forward = settled.0,
            settled_reverse = settled.1,
            elapsed_ms = limits.elapsed_ms(),
            "no connection between origin and destination"
        );
        return Err(SearchError::NoPathFound);
    };

    let route = bidirectional_route(forward.labels(), reverse.labels(), c.forward, c.reverse, c.cost, c.distance);
    debug!(
        cost = route.cost.cost,
        edges = route.edges.len(),
        settled_forward = settled.0,
        settled_reverse = settled.1,
        elapsed_ms = limits.elapsed_ms(),
        "bidirectional route"
    );
    Ok(route)
}

/// Record a connection if `other` has a label on the edge of `this`'s label
fn connect<G, C>(
    this: &ExpansionEngine<'_, G, C>,
    other: &ExpansionEngine<'_, G, C>,
    index: u32,
    best: &mut Option<Connection>,
) where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    let label = this.label(index);
    let Some(status) = other.labels().find(label.edge_id) else {
        return;
    };
    let opposite = other.label(status.index);
    let (fwd, rev, fi, ri) = match this.direction() {
        Direction::Forward => (label, opposite, index, status.index),
        Direction::Reverse => (opposite, label, status.index, index),
    };
    // both labels cover part of the edge; together they must cover all of it
    if fwd.fraction + rev.fraction < 1.0 - FRACTION_TOLERANCE {
        return;
    }
    let cost = fwd.cost + rev.cost - fwd.edge_cost;
    let distance = fwd.distance + rev.distance - fwd.edge_length;
    if best.map_or(true, |b| cost.cost < b.cost.cost) {
        *best = Some(Connection {
            forward: fi,
            reverse: ri,
            cost,
            distance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fixtures;
    use butterfly_common::LatLng;

    fn endpoints(graph: &crate::graph::MemoryGraph, from: u64, to: u64) -> (Location, Location) {
        let origin = graph.origin_at(graph.node_id(from).unwrap()).unwrap();
        let destination = graph.destination_at(graph.node_id(to).unwrap()).unwrap();
        (origin, destination)
    }

    #[test]
    fn test_meets_in_the_middle() {
        let graph = fixtures::graph(&fixtures::line(1, 7, 3.0), true);
        let costing = fixtures::costing();
        let (origin, destination) = endpoints(&graph, 1, 7);
        let route = route_bidirectional(&graph, &costing, &origin, &destination, &fixtures::options()).unwrap();
        assert_eq!(route.cost.cost, 18.0);
        assert_eq!(route.edges.len(), 6);
        let elapsed: Vec<f32> = route.edges.iter().map(|e| e.elapsed_cost).collect();
        assert_eq!(elapsed, vec![3.0, 6.0, 9.0, 12.0, 15.0, 18.0]);
        assert_eq!(route.distance, 18.0);
    }

    #[test]
    fn test_prefers_cheaper_detour() {
        // 1->3 direct costs 15, via 2 costs 10
        let graph = fixtures::graph(&[(1, 2, 5.0), (2, 3, 5.0), (1, 3, 15.0)], true);
        let costing = fixtures::costing();
        let (origin, destination) = endpoints(&graph, 1, 3);
        for use_heuristic in [false, true] {
            let options = SearchOptions {
                use_heuristic,
                ..fixtures::options()
            };
            let route = route_bidirectional(&graph, &costing, &origin, &destination, &options).unwrap();
            assert_eq!(route.cost.cost, 10.0);
            let expected = vec![graph.edge_between(1, 2).unwrap(), graph.edge_between(2, 3).unwrap()];
            assert_eq!(route.edge_ids(), expected);
        }
    }

    #[test]
    fn test_fractional_costs_stay_optimal() {
        let graph = fixtures::graph(&fixtures::detour_within_bucket(), true);
        let costing = fixtures::costing();
        let (origin, destination) = endpoints(&graph, 1, 5);
        let options = SearchOptions {
            use_heuristic: false,
            ..SearchOptions::default()
        };
        let route = route_bidirectional(&graph, &costing, &origin, &destination, &options).unwrap();
        assert!((route.cost.cost - 3.25).abs() < 1e-4, "{}", route.cost.cost);
        assert_eq!(route.edges[1].edge, graph.edge_between(3, 2).unwrap());
    }

    #[test]
    fn test_same_edge_partial() {
        let graph = fixtures::graph(&[(1, 2, 10.0)], true);
        let costing = fixtures::costing();
        let e = graph.edge_between(1, 2).unwrap();
        let origin = Location::new(LatLng::default()).with_candidate(e, 0.25);
        let destination = Location::new(LatLng::default()).with_candidate(e, 0.75);
        let route = route_bidirectional(&graph, &costing, &origin, &destination, &fixtures::options()).unwrap();
        assert_eq!(route.edge_ids(), vec![e]);
        assert!((route.cost.cost - 5.0).abs() < 1e-4);
        assert!((route.distance - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_same_edge_wrong_way_on_oneway() {
        let graph = fixtures::graph(&[(1, 2, 10.0)], true);
        let costing = fixtures::costing();
        let e = graph.edge_between(1, 2).unwrap();
        let origin = Location::new(LatLng::default()).with_candidate(e, 0.75);
        let destination = Location::new(LatLng::default()).with_candidate(e, 0.25);
        let err = route_bidirectional(&graph, &costing, &origin, &destination, &fixtures::options()).unwrap_err();
        assert_eq!(err, SearchError::NoPathFound);
    }

    #[test]
    fn test_max_cost_rejects_long_route() {
        let graph = fixtures::graph(&fixtures::line(1, 5, 4.0), true);
        let costing = fixtures::costing();
        let (origin, destination) = endpoints(&graph, 1, 5);
        let options = SearchOptions {
            max_cost: Some(10.0),
            ..fixtures::options()
        };
        let err = route_bidirectional(&graph, &costing, &origin, &destination, &options).unwrap_err();
        assert_eq!(err, SearchError::NoPathFound);
    }
}
