//! Many-to-many cost matrix
//!
//! One expansion per row: forward from each source towards all targets, or
//! reverse from each target towards all sources when that means fewer
//! expansions. A time-dependent request fixes the direction to the side
//! whose time is known.
//!
//! Rows do not prune not-thru edges. A cell matches the point-to-point route
//! cost unless the cheapest path cuts through a not-thru region, which the
//! bidirectional route avoids.

use serde::Serialize;
use tracing::debug;

use super::expansion::ExpansionEngine;
use super::targets::{search_targets, TargetSet};
use crate::costing::Costing;
use crate::error::{PartialReason, Result};
use crate::graph::{Direction, GraphReader};
use crate::location::{validate_all, Location};
use crate::options::{DateTimeKind, SearchOptions};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatrixCell {
    pub cost: f32,
    pub secs: f32,
    pub distance: f32,
}

impl MatrixCell {
    pub const UNREACHABLE: MatrixCell = MatrixCell {
        cost: f32::MAX,
        secs: f32::MAX,
        distance: f32::MAX,
    };

    pub fn is_reachable(&self) -> bool {
        self.cost < f32::MAX
    }
}

/// Row-major `sources x targets` matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMatrix {
    pub sources: usize,
    pub targets: usize,
    pub cells: Vec<MatrixCell>,
    /// Set when a limit cut the computation short; cells that were not
    /// finished are left unreachable
    pub partial: Option<PartialReason>,
}

impl CostMatrix {
    pub fn get(&self, source: usize, target: usize) -> MatrixCell {
        self.cells[source * self.targets + target]
    }

    pub fn row(&self, source: usize) -> &[MatrixCell] {
        &self.cells[source * self.targets..(source + 1) * self.targets]
    }

    pub fn reachable(&self) -> usize {
        self.cells.iter().filter(|c| c.is_reachable()).count()
    }
}

/// Which way the per-row expansions run
pub fn matrix_direction(sources: usize, targets: usize, options: &SearchOptions) -> Direction {
    match options.date_time.map(|dt| dt.kind) {
        Some(DateTimeKind::DepartAt) => Direction::Forward,
        Some(DateTimeKind::ArriveBy) => Direction::Reverse,
        None if targets < sources => Direction::Reverse,
        None => Direction::Forward,
    }
}

pub fn cost_matrix<G, C>(
    graph: &G,
    costing: &C,
    sources: &[Location],
    targets: &[Location],
    options: &SearchOptions,
) -> Result<CostMatrix>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    validate_all(sources, "sources")?;
    validate_all(targets, "targets")?;
    options.validate()?;
    let limits = options.limits();
    let time = options.time_info();
    let direction = matrix_direction(sources.len(), targets.len(), options);

    let mut matrix = CostMatrix {
        sources: sources.len(),
        targets: targets.len(),
        cells: vec![MatrixCell::UNREACHABLE; sources.len() * targets.len()],
        partial: None,
    };
    let (seeds, goals) = match direction {
        Direction::Forward => (sources, targets),
        Direction::Reverse => (targets, sources),
    };

    let mut settled = 0;
    for (row, seed) in seeds.iter().enumerate() {
        let mut engine = ExpansionEngine::new(graph, costing, direction, options, limits);
        // a heuristic can only aim at one place
        if options.use_heuristic && goals.len() == 1 {
            engine = engine.with_heuristic(goals[0].position);
        }
        let mut set = TargetSet::new(goals, direction);
        engine.watch(set.edges());

        let outcome = search_targets(&mut engine, &mut set, graph, costing, seed, row as u32, time);
        settled += engine.stats().settled;
        if let Err(err) = outcome {
            match err.partial_reason() {
                Some(reason) if options.allow_partial => {
                    debug!(row, %err, "matrix row cut short");
                    matrix.partial.get_or_insert(reason);
                }
                _ => return Err(err),
            }
        }

        for column in 0..goals.len() {
            let Some(hit) = set.hit(column) else {
                continue;
            };
            if !limits.admits(hit.cost.cost, hit.distance) {
                continue;
            }
            let (s, t) = match direction {
                Direction::Forward => (row, column),
                Direction::Reverse => (column, row),
            };
            matrix.cells[s * matrix.targets + t] = MatrixCell {
                cost: hit.cost.cost,
                secs: hit.cost.secs,
                distance: hit.distance,
            };
        }

        // the deadline applies to the whole matrix; label limits to each row
        if matrix.partial == Some(PartialReason::DeadlineExceeded) {
            break;
        }
    }

    debug!(
        sources = matrix.sources,
        targets = matrix.targets,
        ?direction,
        reachable = matrix.reachable(),
        settled,
        partial = ?matrix.partial,
        elapsed_ms = limits.elapsed_ms(),
        "cost matrix"
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::search::fixtures;

    #[test]
    fn test_direction_choice() {
        let opts = SearchOptions::default();
        assert_eq!(matrix_direction(3, 1, &opts), Direction::Reverse);
        assert_eq!(matrix_direction(1, 3, &opts), Direction::Forward);
        assert_eq!(matrix_direction(2, 2, &opts), Direction::Forward);
    }

    #[test]
    fn test_line_matrix() {
        let graph = fixtures::graph(&fixtures::line(1, 5, 2.0), true);
        let costing = fixtures::costing();
        let node = |n| graph.node_id(n).unwrap();
        let sources = vec![graph.origin_at(node(1)).unwrap(), graph.origin_at(node(3)).unwrap()];
        let targets = vec![
            graph.destination_at(node(2)).unwrap(),
            graph.destination_at(node(5)).unwrap(),
        ];
        let m = cost_matrix(&graph, &costing, &sources, &targets, &fixtures::options()).unwrap();
        assert_eq!(m.get(0, 0).cost, 2.0);
        assert_eq!(m.get(0, 1).cost, 8.0);
        // oneway line: node 3 cannot go back to 2
        assert!(!m.get(1, 0).is_reachable());
        assert_eq!(m.get(1, 1).cost, 4.0);
        assert_eq!(m.get(1, 1).distance, 4.0);
        assert!(m.partial.is_none());
        assert_eq!(m.reachable(), 3);
    }

    #[test]
    fn test_fractional_costs_stay_optimal() {
        let graph = fixtures::graph(&fixtures::detour_within_bucket(), true);
        let costing = fixtures::costing();
        let node = |n| graph.node_id(n).unwrap();
        let sources = vec![graph.origin_at(node(1)).unwrap()];
        let targets = vec![graph.destination_at(node(4)).unwrap(), graph.destination_at(node(5)).unwrap()];
        let options = SearchOptions {
            use_heuristic: false,
            ..SearchOptions::default()
        };
        let m = cost_matrix(&graph, &costing, &sources, &targets, &options).unwrap();
        assert!((m.get(0, 0).cost - 0.25).abs() < 1e-4, "{}", m.get(0, 0).cost);
        assert!((m.get(0, 1).cost - 3.25).abs() < 1e-4, "{}", m.get(0, 1).cost);
    }

    #[test]
    fn test_reverse_rows_match_forward() {
        let graph = fixtures::graph(&[(1, 2, 3.0), (2, 3, 4.0), (3, 1, 5.0), (2, 4, 2.0)], false);
        let costing = fixtures::costing();
        let node = |n| graph.node_id(n).unwrap();
        let sources: Vec<Location> = [1, 3, 4].into_iter().map(|n| graph.origin_at(node(n)).unwrap()).collect();
        let targets = vec![graph.destination_at(node(2)).unwrap()];

        let reverse = cost_matrix(&graph, &costing, &sources, &targets, &fixtures::options()).unwrap();
        for (s, source) in sources.iter().enumerate() {
            let forward = cost_matrix(&graph, &costing, std::slice::from_ref(source), &targets, &fixtures::options())
                .unwrap();
            assert_eq!(reverse.get(s, 0).cost, forward.get(0, 0).cost);
        }
        assert_eq!(reverse.get(0, 0).cost, 3.0);
        assert_eq!(reverse.get(2, 0).cost, 2.0);
    }

    #[test]
    fn test_label_limit_partial() {
        let graph = fixtures::graph(&fixtures::line(1, 30, 2.0), true);
        let costing = fixtures::costing();
        let node = |n| graph.node_id(n).unwrap();
        let sources = vec![graph.origin_at(node(1)).unwrap()];
        let targets = vec![
            graph.destination_at(node(3)).unwrap(),
            graph.destination_at(node(30)).unwrap(),
        ];
        let strict = SearchOptions {
            max_labels: 5,
            ..fixtures::options()
        };
        let err = cost_matrix(&graph, &costing, &sources, &targets, &strict).unwrap_err();
        assert_eq!(err, SearchError::ResourceExceeded { limit: 5 });

        let lenient = SearchOptions {
            allow_partial: true,
            ..strict
        };
        let m = cost_matrix(&graph, &costing, &sources, &targets, &lenient).unwrap();
        assert_eq!(m.partial, Some(PartialReason::ResourceExceeded));
        assert_eq!(m.get(0, 0).cost, 4.0);
        assert!(!m.get(0, 1).is_reachable());
    }

    #[test]
    fn test_empty_targets_rejected() {
        let graph = fixtures::graph(&fixtures::line(1, 3, 2.0), true);
        let costing = fixtures::costing();
        let sources = vec![graph.origin_at(graph.node_id(1).unwrap()).unwrap()];
        let err = cost_matrix(&graph, &costing, &sources, &[], &fixtures::options()).unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
    }
}
