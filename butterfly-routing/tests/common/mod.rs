//! Graph fixtures shared by the integration tests
#![allow(dead_code)]

use butterfly_routing::graph::{EdgeSpec, GraphSpec, NodeSpec};
use butterfly_routing::{CostingOptions, Location, MemoryGraph, SearchOptions, SpeedCosting};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Nodes on the equator, ~1.1 m apart per id step
pub fn node(id: u64) -> NodeSpec {
    NodeSpec::new(id, 0.0, id as f64 * 1e-5)
}

/// Edge from `a` to `b` whose cost in seconds equals `cost` (1 m/s)
pub fn edge(a: u64, b: u64, cost: f32) -> EdgeSpec {
    EdgeSpec::new(a, b).length(cost).speed(3.6)
}

pub fn spec(edges: &[(u64, u64, f32)], oneway: bool) -> GraphSpec {
    let mut ids: Vec<u64> = edges.iter().flat_map(|&(a, b, _)| [a, b]).collect();
    ids.sort_unstable();
    ids.dedup();
    GraphSpec {
        nodes: ids.into_iter().map(node).collect(),
        edges: edges
            .iter()
            .map(|&(a, b, c)| {
                let e = edge(a, b, c);
                if oneway {
                    e.oneway()
                } else {
                    e
                }
            })
            .collect(),
        restrictions: vec![],
    }
}

pub fn graph(edges: &[(u64, u64, f32)], oneway: bool) -> MemoryGraph {
    MemoryGraph::from_spec(&spec(edges, oneway)).expect("fixture graph")
}

pub fn line(first: u64, last: u64, cost: f32) -> Vec<(u64, u64, f32)> {
    (first..last).map(|i| (i, i + 1, cost)).collect()
}

/// Travel-time costing without turn penalties, so costs are exactly the sum
/// of edge costs
pub fn costing() -> SpeedCosting {
    SpeedCosting::new(CostingOptions {
        turn_penalties: false,
        ..CostingOptions::default()
    })
    .expect("fixture costing")
}

/// Unit buckets
pub fn options() -> SearchOptions {
    SearchOptions {
        bucket_size: Some(1.0),
        ..SearchOptions::default()
    }
}

pub fn origin(graph: &MemoryGraph, node: u64) -> Location {
    let id = graph.node_id(node).expect("known node");
    graph.origin_at(id).expect("node has outbound edges")
}

pub fn destination(graph: &MemoryGraph, node: u64) -> Location {
    let id = graph.node_id(node).expect("known node");
    graph.destination_at(id).expect("node has inbound edges")
}

/// `n` x `n` grid of streets about 11 m apart with random integer costs in
/// [2, 20]. Columns are two-way; about a third of the row streets in odd
/// rows are one-way, so every node can be left and reached.
pub fn random_grid(n: u64, seed: u64) -> MemoryGraph {
    let spec = grid_spec(n, seed, 1e-4, |rng| rng.random_range(2..=20) as f32);
    MemoryGraph::from_spec(&spec).expect("grid graph")
}

/// Grid with costs in [0.05, 3.00] that rarely fall on a unit boundary.
/// Nodes are about 0.11 m apart so the distance heuristic stays below every
/// edge cost.
pub fn fractional_grid(n: u64, seed: u64) -> GraphSpec {
    grid_spec(n, seed, 1e-6, |rng| rng.random_range(5..=300) as f32 / 100.0)
}

pub fn grid_spec(n: u64, seed: u64, spacing_deg: f64, mut cost: impl FnMut(&mut StdRng) -> f32) -> GraphSpec {
    let mut rng = StdRng::seed_from_u64(seed);
    let id = |row: u64, col: u64| row * n + col + 1;
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for row in 0..n {
        for col in 0..n {
            nodes.push(NodeSpec::new(
                id(row, col),
                row as f64 * spacing_deg,
                col as f64 * spacing_deg,
            ));
            if row + 1 < n {
                let c = cost(&mut rng);
                edges.push(edge(id(row, col), id(row + 1, col), c));
            }
            if col + 1 < n {
                let c = cost(&mut rng);
                let e = if rng.random_bool(0.5) {
                    edge(id(row, col), id(row, col + 1), c)
                } else {
                    edge(id(row, col + 1), id(row, col), c)
                };
                let oneway = row % 2 == 1 && rng.random_bool(0.35);
                edges.push(if oneway { e.oneway() } else { e });
            }
        }
    }
    GraphSpec {
        nodes,
        edges,
        restrictions: vec![],
    }
}

#[derive(Debug, PartialEq)]
struct Queued {
    cost: f64,
    node: u64,
}

impl Eq for Queued {}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on cost
        other.cost.total_cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Textbook node-based Dijkstra over a graph description built from
/// [`edge`] (cost = length). Without turn costs this is what any edge-based
/// search from a node origin to a node destination must find.
pub fn dijkstra(spec: &GraphSpec, from: u64) -> HashMap<u64, f64> {
    let mut adjacency: HashMap<u64, Vec<(u64, f64)>> = HashMap::new();
    for e in &spec.edges {
        let cost = f64::from(e.length.expect("fixture edges carry a length"));
        adjacency.entry(e.from).or_default().push((e.to, cost));
        if !e.oneway {
            adjacency.entry(e.to).or_default().push((e.from, cost));
        }
    }

    let mut dist: HashMap<u64, f64> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(from, 0.0);
    heap.push(Queued { cost: 0.0, node: from });
    while let Some(Queued { cost, node }) = heap.pop() {
        if dist.get(&node).is_some_and(|&d| cost > d) {
            continue;
        }
        for &(next, c) in adjacency.get(&node).map(Vec::as_slice).unwrap_or_default() {
            let candidate = cost + c;
            if dist.get(&next).map_or(true, |&d| candidate < d) {
                dist.insert(next, candidate);
                heap.push(Queued {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }
    dist
}
