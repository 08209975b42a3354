mod common;

use butterfly_routing::graph::{EdgeSpec, GraphSpec, NodeSpec, RestrictionSpec};
use butterfly_routing::{
    find_route, recost, route_bidirectional, route_unidirectional, CostingOptions, DateTimeKind, DateTimeOption,
    Direction, MemoryGraph, SearchError, SearchOptions, SpeedCosting,
};
use chrono::NaiveDate;

#[test]
fn test_single_edge() {
    let graph = common::graph(&[(1, 2, 10.0)], true);
    let route = find_route(
        &graph,
        &common::costing(),
        &common::origin(&graph, 1),
        &common::destination(&graph, 2),
        &common::options(),
    )
    .unwrap();
    assert_eq!(route.cost.cost, 10.0);
    assert_eq!(route.edge_ids(), vec![graph.edge_between(1, 2).unwrap()]);
    assert_eq!(route.distance, 10.0);
}

#[test]
fn test_restriction_forces_detour() {
    let mut spec = common::spec(&[(1, 2, 2.0), (2, 3, 2.0), (1, 4, 5.0), (4, 3, 5.0)], true);
    let graph = MemoryGraph::from_spec(&spec).unwrap();
    let costing = common::costing();
    let (from, to) = (common::origin(&graph, 1), common::destination(&graph, 3));
    let open = find_route(&graph, &costing, &from, &to, &common::options()).unwrap();
    assert_eq!(open.cost.cost, 4.0);

    spec.restrictions.push(RestrictionSpec { from: 1, via: 2, to: 3 });
    let graph = MemoryGraph::from_spec(&spec).unwrap();
    let expected = vec![graph.edge_between(1, 4).unwrap(), graph.edge_between(4, 3).unwrap()];

    let route = route_bidirectional(&graph, &costing, &from, &to, &common::options()).unwrap();
    assert_eq!(route.cost.cost, 10.0);
    assert_eq!(route.edge_ids(), expected);

    for direction in [Direction::Forward, Direction::Reverse] {
        let route = route_unidirectional(&graph, &costing, &from, &to, &common::options(), direction).unwrap();
        assert_eq!(route.cost.cost, 10.0, "{direction:?}");
        assert_eq!(route.edge_ids(), expected, "{direction:?}");
    }

    let ignoring = SpeedCosting::new(CostingOptions {
        turn_penalties: false,
        ignore_restrictions: true,
        ..CostingOptions::default()
    })
    .unwrap();
    let route = find_route(&graph, &ignoring, &from, &to, &common::options()).unwrap();
    assert_eq!(route.cost.cost, 4.0);
}

#[test]
fn test_disconnected_components() {
    let graph = common::graph(&[(1, 2, 2.0), (2, 3, 2.0), (10, 11, 2.0)], false);
    let err = find_route(
        &graph,
        &common::costing(),
        &common::origin(&graph, 1),
        &common::destination(&graph, 11),
        &common::options(),
    )
    .unwrap_err();
    assert_eq!(err, SearchError::NoPathFound);
}

#[test]
fn test_label_limit() {
    let graph = common::graph(&common::line(1, 50, 2.0), true);
    let options = SearchOptions {
        max_labels: 3,
        ..common::options()
    };
    let err = find_route(
        &graph,
        &common::costing(),
        &common::origin(&graph, 1),
        &common::destination(&graph, 50),
        &options,
    )
    .unwrap_err();
    assert_eq!(err, SearchError::ResourceExceeded { limit: 3 });
}

#[test]
fn test_expired_deadline() {
    let graph = common::graph(&common::line(1, 10, 2.0), true);
    let options = SearchOptions {
        timeout_ms: Some(0),
        ..common::options()
    };
    let err = find_route(
        &graph,
        &common::costing(),
        &common::origin(&graph, 1),
        &common::destination(&graph, 10),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, SearchError::DeadlineExceeded { .. }), "{err:?}");
}

#[test]
fn test_unavailable_tile_aborts() {
    // two nodes on each side of the 0.25 degree tile boundary
    let spec = GraphSpec {
        nodes: vec![
            NodeSpec::new(1, 0.1, 0.1),
            NodeSpec::new(2, 0.1, 0.2),
            NodeSpec::new(3, 0.1, 0.3),
            NodeSpec::new(4, 0.1, 0.4),
        ],
        edges: vec![EdgeSpec::new(1, 2), EdgeSpec::new(2, 3), EdgeSpec::new(3, 4)],
        restrictions: vec![],
    };
    let mut graph = MemoryGraph::from_spec(&spec).unwrap();
    let costing = common::costing();
    let (from, to) = (common::origin(&graph, 1), common::destination(&graph, 4));
    assert!(find_route(&graph, &costing, &from, &to, &SearchOptions::default()).is_ok());

    let far_tile = graph.node_id(3).unwrap();
    graph.set_tile_available(far_tile, false);
    let err = route_unidirectional(&graph, &costing, &from, &to, &SearchOptions::default(), Direction::Forward)
        .unwrap_err();
    let SearchError::TileUnavailable(id) = err else {
        panic!("expected an unavailable tile, got {err:?}");
    };
    assert_eq!(id.tile_base(), far_tile.tile_base());
}

#[test]
fn test_recost_agrees_with_search() {
    let graph = common::random_grid(8, 7);
    let costing = common::costing();
    let mut checked = 0;
    for (from, to) in [(1, 64), (8, 57), (20, 45), (64, 1)] {
        let (origin, destination) = (common::origin(&graph, from), common::destination(&graph, to));
        let Ok(route) = find_route(&graph, &costing, &origin, &destination, &common::options()) else {
            continue;
        };
        let cost = recost(&graph, &costing, &route.edge_ids(), 1.0, 1.0).unwrap();
        assert!((cost.cost - route.cost.cost).abs() < 1e-3, "{from}->{to}: {} vs {}", cost.cost, route.cost.cost);
        checked += 1;
    }
    assert!(checked > 0);
}

#[test]
fn test_time_dependent_directions() {
    // 1 -> 2 is fast at night and slow at rush hour; 1 -> 3 -> 2 is steady
    let mut spec = common::spec(&[(1, 3, 30.0), (3, 2, 30.0)], true);
    let mut congested = common::edge(1, 2, 40.0).oneway();
    congested.congested_speed = Some(0.9);
    spec.edges.push(congested);
    let graph = MemoryGraph::from_spec(&spec).unwrap();
    let costing = SpeedCosting::new(CostingOptions {
        turn_penalties: false,
        use_time_dependent_speeds: true,
        ..CostingOptions::default()
    })
    .unwrap();
    let (from, to) = (common::origin(&graph, 1), common::destination(&graph, 2));
    let at = |hour| {
        // 2024-01-03 is a Wednesday
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    };

    for kind in [DateTimeKind::DepartAt, DateTimeKind::ArriveBy] {
        let night = SearchOptions {
            date_time: Some(DateTimeOption { kind, value: at(3) }),
            ..common::options()
        };
        let route = find_route(&graph, &costing, &from, &to, &night).unwrap();
        assert_eq!(route.cost.cost, 40.0, "{kind:?}");

        let rush = SearchOptions {
            date_time: Some(DateTimeOption { kind, value: at(8) }),
            ..common::options()
        };
        let route = find_route(&graph, &costing, &from, &to, &rush).unwrap();
        assert_eq!(route.cost.cost, 60.0, "{kind:?}");
        assert_eq!(route.edges.len(), 2);
    }
}
