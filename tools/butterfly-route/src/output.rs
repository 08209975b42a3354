//! JSON shapes printed on stdout
//!
//! Edges are reported by their external end node ids so results can be
//! read against the input graph file.

use anyhow::Result;
use butterfly_routing::{Centroid, CostMatrix, GraphId, Isochrone, MemoryGraph, PartialReason, Route};
use serde::Serialize;
use std::io::Write;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct EdgeRef {
    pub from: u64,
    pub to: u64,
}

impl EdgeRef {
    fn new(graph: &MemoryGraph, edge: GraphId) -> Option<Self> {
        graph.edge_nodes(edge).map(|(from, to)| EdgeRef { from, to })
    }
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    pub cost: f32,
    pub duration_s: f32,
    pub distance_m: f32,
    /// Node ids passed, first to last
    pub nodes: Vec<u64>,
    pub elapsed_cost: Vec<f32>,
}

impl RouteOutput {
    pub fn new(graph: &MemoryGraph, route: &Route) -> Self {
        let mut nodes = Vec::with_capacity(route.edges.len() + 1);
        for (i, edge) in route.edges.iter().enumerate() {
            if let Some((from, to)) = graph.edge_nodes(edge.edge) {
                if i == 0 {
                    nodes.push(from);
                }
                nodes.push(to);
            }
        }
        RouteOutput {
            cost: route.cost.cost,
            duration_s: route.cost.secs,
            distance_m: route.distance,
            nodes,
            elapsed_cost: route.edges.iter().map(|e| e.elapsed_cost).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatrixOutput {
    /// `null` where a target is unreachable
    pub costs: Vec<Vec<Option<f32>>>,
    pub durations_s: Vec<Vec<Option<f32>>>,
    pub distances_m: Vec<Vec<Option<f32>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialReason>,
}

impl From<&CostMatrix> for MatrixOutput {
    fn from(matrix: &CostMatrix) -> Self {
        let table = |value: fn(&butterfly_routing::MatrixCell) -> f32| -> Vec<Vec<Option<f32>>> {
            (0..matrix.sources)
                .map(|s| {
                    matrix
                        .row(s)
                        .iter()
                        .map(|cell| cell.is_reachable().then(|| value(cell)))
                        .collect()
                })
                .collect()
        };
        MatrixOutput {
            costs: table(|c| c.cost),
            durations_s: table(|c| c.secs),
            distances_m: table(|c| c.distance),
            partial: matrix.partial,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContourOutput {
    pub threshold: f32,
    pub edges: Vec<EdgeRef>,
    pub frontier: Vec<FrontierOutput>,
}

#[derive(Debug, Serialize)]
pub struct FrontierOutput {
    #[serde(flatten)]
    pub edge: EdgeRef,
    /// Share of the edge inside the contour
    pub fraction: f32,
}

#[derive(Debug, Serialize)]
pub struct IsochroneOutput {
    pub contours: Vec<ContourOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialReason>,
}

impl IsochroneOutput {
    pub fn new(graph: &MemoryGraph, isochrone: &Isochrone) -> Self {
        let contours = isochrone
            .contours
            .iter()
            .map(|contour| ContourOutput {
                threshold: contour.threshold,
                edges: contour
                    .edges
                    .iter()
                    .filter_map(|e| EdgeRef::new(graph, e.edge))
                    .collect(),
                frontier: contour
                    .frontier
                    .iter()
                    .filter_map(|f| {
                        EdgeRef::new(graph, f.edge).map(|edge| FrontierOutput {
                            edge,
                            fraction: f.fraction,
                        })
                    })
                    .collect(),
            })
            .collect();
        IsochroneOutput {
            contours,
            partial: isochrone.partial,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CentroidOutput {
    pub edge: Option<EdgeRef>,
    pub lat: f64,
    pub lon: f64,
    pub cost: f32,
    /// One route per input location
    pub routes: Vec<RouteOutput>,
}

impl CentroidOutput {
    pub fn new(graph: &MemoryGraph, centroid: &Centroid) -> Self {
        CentroidOutput {
            edge: EdgeRef::new(graph, centroid.edge),
            lat: centroid.position.lat,
            lon: centroid.position.lon,
            cost: centroid.cost,
            routes: centroid.routes.iter().map(|r| RouteOutput::new(graph, r)).collect(),
        }
    }
}
