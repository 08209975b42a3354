//! Unidirectional point-to-point search
//!
//! Used for time-dependent requests, where only one end of the trip has a
//! known time: forward from the origin for `depart_at`, reverse from the
//! destination for `arrive_by`. Without a heuristic it is plain Dijkstra.

use tracing::debug;

use super::expansion::ExpansionEngine;
use super::path::{target_route, Route};
use super::targets::{search_targets, TargetSet};
use crate::costing::Costing;
use crate::error::{Result, SearchError};
use crate::graph::{Direction, GraphReader};
use crate::location::Location;
use crate::options::SearchOptions;

pub fn route_unidirectional<G, C>(
    graph: &G,
    costing: &C,
    origin: &Location,
    destination: &Location,
    options: &SearchOptions,
    direction: Direction,
) -> Result<Route>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    origin.validate()?;
    destination.validate()?;
    options.validate()?;
    let limits = options.limits();
    let time = options.time_info();

    let (seed, target) = match direction {
        Direction::Forward => (origin, destination),
        Direction::Reverse => (destination, origin),
    };

    let mut engine = ExpansionEngine::new(graph, costing, direction, options, limits);
    if options.use_heuristic {
        engine = engine.with_heuristic(target.position);
    }
    let mut targets = TargetSet::new(std::slice::from_ref(target), direction);
    engine.watch(targets.edges());

    search_targets(&mut engine, &mut targets, graph, costing, seed, 0, time)?;

    let stats = engine.stats();
    let hit = targets.hit(0).copied().filter(|h| limits.admits(h.cost.cost, h.distance));

    let Some(hit) = hit else {
        debug!(
            ?direction,
            settled = stats.settled,
            elapsed_ms = limits.elapsed_ms(),
            "no path found"
        );
        return Err(SearchError::NoPathFound);
    };

    let route = target_route(engine.labels(), &hit);
    debug!(
        ?direction,
        cost = route.cost.cost,
        edges = route.edges.len(),
        settled = stats.settled,
        inserted = stats.inserted,
        elapsed_ms = limits.elapsed_ms(),
        "unidirectional route"
    );
    Ok(route)
}
