//! Reachability within cost thresholds
//!
//! A single expansion seeded at every origin runs until the next label to
//! settle is above the largest threshold. Each threshold is then cut out of
//! the same label store: edges whose far end is within it are reached in
//! full, edges whose near end is within it are frontier edges, reached part
//! way.

use butterfly_common::GraphId;
use serde::Serialize;
use tracing::debug;

use super::expansion::{ExpansionEngine, Step};
use super::label::{EdgeLabel, LabelStore};
use crate::costing::Costing;
use crate::error::{PartialReason, Result, SearchError};
use crate::graph::{Direction, GraphReader};
use crate::location::{validate_all, Location};
use crate::options::{DateTimeKind, SearchOptions};
use crate::time::TimeInfo;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReachedEdge {
    pub edge: GraphId,
    pub cost: f32,
    pub secs: f32,
    pub distance: f32,
    /// Index of the origin the edge was reached from
    pub origin: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrontierEdge {
    pub edge: GraphId,
    pub cost_at_entry: f32,
    pub cost_at_exit: f32,
    /// Share of the traversed span reachable within the threshold
    pub fraction: f32,
    pub origin: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    pub threshold: f32,
    pub edges: Vec<ReachedEdge>,
    pub frontier: Vec<FrontierEdge>,
}

impl Contour {
    pub fn contains(&self, edge: GraphId) -> bool {
        self.edges.iter().any(|e| e.edge == edge)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Isochrone {
    /// Forward from the origins, or reverse into them for `arrive_by`
    pub direction: Direction,
    /// One contour per distinct threshold, ascending
    pub contours: Vec<Contour>,
    pub partial: Option<PartialReason>,
}

pub fn isochrone<G, C>(
    graph: &G,
    costing: &C,
    origins: &[Location],
    thresholds: &[f32],
    options: &SearchOptions,
) -> Result<Isochrone>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    validate_all(origins, "origins")?;
    options.validate()?;
    let thresholds = normalize_thresholds(thresholds)?;
    let max_threshold = thresholds.last().copied().unwrap_or_default();
    let limits = options.limits();
    let time = options.time_info();
    let direction = match options.date_time.map(|dt| dt.kind) {
        Some(DateTimeKind::ArriveBy) => Direction::Reverse,
        _ => Direction::Forward,
    };

    let mut engine = ExpansionEngine::new(graph, costing, direction, options, limits)
        .with_termination(Box::new(move |label: &EdgeLabel| label.cost.cost > max_threshold));

    let mut partial = None;
    if let Err(err) = expand(&mut engine, origins, time) {
        match err.partial_reason() {
            Some(reason) if options.allow_partial => partial = Some(reason),
            _ => return Err(err),
        }
    }

    let contours: Vec<Contour> = thresholds.iter().map(|&t| contour(engine.labels(), t)).collect();
    debug!(
        origins = origins.len(),
        ?direction,
        thresholds = contours.len(),
        reached = contours.last().map_or(0, |c| c.edges.len()),
        settled = engine.stats().settled,
        ?partial,
        elapsed_ms = limits.elapsed_ms(),
        "isochrone"
    );
    Ok(Isochrone {
        direction,
        contours,
        partial,
    })
}

fn normalize_thresholds(thresholds: &[f32]) -> Result<Vec<f32>> {
    if thresholds.is_empty() {
        return Err(SearchError::InvalidRequest("no thresholds given".into()));
    }
    if let Some(bad) = thresholds.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
        return Err(SearchError::InvalidRequest(format!(
            "threshold must be a non-negative number, got {bad}"
        )));
    }
    let mut sorted = thresholds.to_vec();
    sorted.sort_by(f32::total_cmp);
    sorted.dedup();
    Ok(sorted)
}

fn expand<G, C>(
    engine: &mut ExpansionEngine<'_, G, C>,
    origins: &[Location],
    time: Option<TimeInfo>,
) -> Result<()>
where
    G: GraphReader + ?Sized,
    C: Costing + ?Sized,
{
    for (i, origin) in origins.iter().enumerate() {
        engine.seed(origin, i as u32, time)?;
    }
    while let Step::Settled(_) = engine.next()? {}
    Ok(())
}

fn contour(labels: &LabelStore, threshold: f32) -> Contour {
    let mut edges = Vec::new();
    let mut frontier = Vec::new();
    for (_, label) in labels.iter() {
        let near = label.cost_at_entry().cost;
        let far = label.cost.cost;
        if far <= threshold {
            edges.push(ReachedEdge {
                edge: label.edge_id,
                cost: far,
                secs: label.cost.secs,
                distance: label.distance,
                origin: label.origin,
            });
        } else if near <= threshold {
            frontier.push(FrontierEdge {
                edge: label.edge_id,
                cost_at_entry: near,
                cost_at_exit: far,
                fraction: (threshold - near) / (far - near),
                origin: label.origin,
            });
        }
    }
    Contour {
        threshold,
        edges,
        frontier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::fixtures;

    #[test]
    fn test_chain_cut_at_threshold() {
        let graph = fixtures::graph(&fixtures::line(1, 10, 2.0), true);
        let costing = fixtures::costing();
        let origin = graph.origin_at(graph.node_id(1).unwrap()).unwrap();
        let iso = isochrone(&graph, &costing, &[origin], &[5.0], &fixtures::options()).unwrap();
        let contour = &iso.contours[0];

        let mut reached: Vec<GraphId> = contour.edges.iter().map(|e| e.edge).collect();
        reached.sort();
        let mut expected = vec![graph.edge_between(1, 2).unwrap(), graph.edge_between(2, 3).unwrap()];
        expected.sort();
        assert_eq!(reached, expected);

        assert_eq!(contour.frontier.len(), 1);
        let f = contour.frontier[0];
        assert_eq!(f.edge, graph.edge_between(3, 4).unwrap());
        assert_eq!(f.cost_at_entry, 4.0);
        assert_eq!(f.cost_at_exit, 6.0);
        assert!((f.fraction - 0.5).abs() < 1e-6);
        assert!(!contour.contains(graph.edge_between(4, 5).unwrap()));
    }

    #[test]
    fn test_fractional_costs_inside_one_bucket() {
        // 1->3 and 3->4 end at 5.2 and 5.4, 1->2 at 5.8: all in bucket [5, 6)
        let graph = fixtures::graph(&[(1, 2, 5.8), (1, 3, 5.2), (3, 4, 0.2)], true);
        let costing = fixtures::costing();
        let origin = graph.origin_at(graph.node_id(1).unwrap()).unwrap();
        let iso = isochrone(&graph, &costing, &[origin], &[5.5], &fixtures::options()).unwrap();
        let contour = &iso.contours[0];

        assert!(contour.contains(graph.edge_between(1, 3).unwrap()));
        assert!(contour.contains(graph.edge_between(3, 4).unwrap()));
        assert_eq!(contour.edges.len(), 2);
        assert_eq!(contour.frontier.len(), 1);
        let f = contour.frontier[0];
        assert_eq!(f.edge, graph.edge_between(1, 2).unwrap());
        assert!((f.fraction - 5.5 / 5.8).abs() < 1e-4);
    }

    #[test]
    fn test_contours_nest() {
        let graph = fixtures::graph(
            &[(1, 2, 3.0), (2, 3, 3.0), (1, 4, 2.0), (4, 5, 6.0), (3, 5, 2.0), (5, 6, 4.0)],
            false,
        );
        let costing = fixtures::costing();
        let origin = graph.origin_at(graph.node_id(1).unwrap()).unwrap();
        let iso = isochrone(&graph, &costing, &[origin], &[12.0, 4.0, 8.0, 8.0], &fixtures::options()).unwrap();
        let thresholds: Vec<f32> = iso.contours.iter().map(|c| c.threshold).collect();
        assert_eq!(thresholds, vec![4.0, 8.0, 12.0]);
        for pair in iso.contours.windows(2) {
            for e in &pair[0].edges {
                assert!(pair[1].contains(e.edge));
            }
            assert!(pair[1].edges.len() >= pair[0].edges.len());
        }
    }

    #[test]
    fn test_multiple_origins_tag_edges() {
        let graph = fixtures::graph(&[(1, 2, 2.0), (3, 4, 2.0)], true);
        let costing = fixtures::costing();
        let origins = vec![
            graph.origin_at(graph.node_id(1).unwrap()).unwrap(),
            graph.origin_at(graph.node_id(3).unwrap()).unwrap(),
        ];
        let iso = isochrone(&graph, &costing, &origins, &[10.0], &fixtures::options()).unwrap();
        let contour = &iso.contours[0];
        let origin_of = |edge| contour.edges.iter().find(|e| e.edge == edge).map(|e| e.origin);
        assert_eq!(origin_of(graph.edge_between(1, 2).unwrap()), Some(0));
        assert_eq!(origin_of(graph.edge_between(3, 4).unwrap()), Some(1));
    }

    #[test]
    fn test_bad_thresholds() {
        let graph = fixtures::graph(&[(1, 2, 2.0)], true);
        let costing = fixtures::costing();
        let origin = graph.origin_at(graph.node_id(1).unwrap()).unwrap();
        let cases: [&[f32]; 3] = [&[], &[-1.0], &[f32::NAN]];
        for bad in cases {
            let err = isochrone(&graph, &costing, std::slice::from_ref(&origin), bad, &fixtures::options())
                .unwrap_err();
            assert!(matches!(err, SearchError::InvalidRequest(_)));
        }
    }
}
