//! CLI commands for butterfly-route

use anyhow::{bail, Context, Result};
use butterfly_routing::{
    centroid, cost_matrix, find_route, isochrone, CostingOptions, DateTimeKind, DateTimeOption, LatLng, Location,
    MemoryGraph, Mode, SearchOptions, SpeedCosting,
};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::bench::BenchArgs;
use crate::generate::GenerateArgs;
use crate::logging::LogFormat;
use crate::output::{print_json, CentroidOutput, IsochroneOutput, MatrixOutput, RouteOutput};

#[derive(Parser)]
#[command(name = "butterfly-route")]
#[command(about = "Routes, matrices, isochrones and meeting points over a road graph", long_about = None)]
pub struct Cli {
    /// Debug logging from the search core
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cheapest route between two coordinates
    Route(RouteArgs),

    /// Cost table between sources and targets
    Matrix(MatrixArgs),

    /// Edges reachable within cost thresholds
    Isochrone(IsochroneArgs),

    /// Cheapest common meeting point of several coordinates
    Centroid(CentroidArgs),

    /// Random route queries on a worker pool, reporting latency percentiles
    Bench(BenchArgs),

    /// Write a synthetic grid graph
    Generate(GenerateArgs),
}

/// Graph, costing and search options shared by every request command
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Graph description (JSON)
    #[arg(long)]
    pub graph: PathBuf,

    /// Search options (JSON); the flags below override it
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Costing options (JSON)
    #[arg(long)]
    pub costing: Option<PathBuf>,

    /// Travel mode (car, bike, foot)
    #[arg(long)]
    pub mode: Option<Mode>,

    #[arg(long)]
    pub max_labels: Option<usize>,

    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long)]
    pub max_cost: Option<f32>,

    /// Plain Dijkstra instead of A*
    #[arg(long)]
    pub no_heuristic: bool,

    /// Departure time, e.g. 2024-01-03T08:00
    #[arg(long, value_parser = parse_datetime, conflicts_with = "arrive_by")]
    pub depart_at: Option<NaiveDateTime>,

    /// Arrival time, e.g. 2024-01-03T08:00
    #[arg(long, value_parser = parse_datetime)]
    pub arrive_by: Option<NaiveDateTime>,

    /// Return partial matrices and isochrones instead of failing on limits
    #[arg(long)]
    pub allow_partial: bool,
}

impl SearchArgs {
    pub fn load_graph(&self) -> Result<MemoryGraph> {
        load_graph(&self.graph)
    }

    pub fn search_options(&self) -> Result<SearchOptions> {
        let mut options: SearchOptions = match &self.options {
            Some(path) => read_json(path, "search options")?,
            None => SearchOptions::default(),
        };
        if let Some(max_labels) = self.max_labels {
            options.max_labels = max_labels;
        }
        if self.timeout_ms.is_some() {
            options.timeout_ms = self.timeout_ms;
        }
        if self.max_cost.is_some() {
            options.max_cost = self.max_cost;
        }
        if self.no_heuristic {
            options.use_heuristic = false;
        }
        if self.allow_partial {
            options.allow_partial = true;
        }
        if let Some(value) = self.depart_at {
            options.date_time = Some(DateTimeOption {
                kind: DateTimeKind::DepartAt,
                value,
            });
        }
        if let Some(value) = self.arrive_by {
            options.date_time = Some(DateTimeOption {
                kind: DateTimeKind::ArriveBy,
                value,
            });
        }
        options.validate()?;
        Ok(options)
    }

    pub fn costing(&self) -> Result<SpeedCosting> {
        let mut options: CostingOptions = match &self.costing {
            Some(path) => read_json(path, "costing options")?,
            None => CostingOptions::default(),
        };
        if let Some(mode) = self.mode {
            options.mode = mode;
        }
        Ok(SpeedCosting::new(options)?)
    }

    fn arrives(&self) -> bool {
        self.arrive_by.is_some()
    }
}

#[derive(Args, Debug, Clone)]
pub struct RouteArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Start coordinate (lat,lon)
    #[arg(long)]
    pub from: String,

    /// End coordinate (lat,lon)
    #[arg(long)]
    pub to: String,
}

#[derive(Args, Debug, Clone)]
pub struct MatrixArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Source coordinates, "lat,lon;lat,lon;..."
    #[arg(long)]
    pub sources: String,

    /// Target coordinates, "lat,lon;lat,lon;..."
    #[arg(long)]
    pub targets: String,
}

#[derive(Args, Debug, Clone)]
pub struct IsochroneArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Origin coordinates, "lat,lon;lat,lon;..."
    #[arg(long)]
    pub from: String,

    /// Cost thresholds (seconds for the speed costing)
    #[arg(long, value_delimiter = ',', required = true)]
    pub thresholds: Vec<f32>,
}

#[derive(Args, Debug, Clone)]
pub struct CentroidArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Coordinates to meet from, "lat,lon;lat,lon;..."
    #[arg(long)]
    pub locations: String,
}

/// Which end of a trip a coordinate is snapped for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Origin,
    Destination,
}

pub fn parse_coord(s: &str) -> Result<LatLng> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        bail!("coordinate must be in format 'lat,lon', got '{s}'");
    }
    let lat = parts[0]
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid latitude in '{s}'"))?;
    let lon = parts[1]
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid longitude in '{s}'"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        bail!("coordinate '{s}' is out of range");
    }
    Ok(LatLng::new(lat, lon))
}

pub fn parse_coords(s: &str) -> Result<Vec<LatLng>> {
    s.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(parse_coord)
        .collect()
}

fn parse_datetime(s: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM[:SS], got '{s}': {e}"))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid {what} in {}", path.display()))
}

pub fn load_graph(path: &Path) -> Result<MemoryGraph> {
    let start = Instant::now();
    let json = std::fs::read_to_string(path).with_context(|| format!("failed to read graph {}", path.display()))?;
    let graph = MemoryGraph::from_json(&json).with_context(|| format!("invalid graph {}", path.display()))?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "graph loaded"
    );
    Ok(graph)
}

/// Location at the node nearest to `position`
pub fn snap(graph: &MemoryGraph, position: LatLng, end: End) -> Result<Location> {
    let node = graph.nearest_node(position).context("graph has no nodes")?;
    let location = match end {
        End::Origin => graph.origin_at(node),
        End::Destination => graph.destination_at(node),
    };
    location.with_context(|| {
        format!(
            "node nearest to {},{} has no {} edges",
            position.lat,
            position.lon,
            if end == End::Origin { "outgoing" } else { "incoming" }
        )
    })
}

fn snap_all(graph: &MemoryGraph, coords: &str, end: End) -> Result<Vec<Location>> {
    parse_coords(coords)?
        .into_iter()
        .map(|position| snap(graph, position, end))
        .collect()
}

pub fn run_route(args: &RouteArgs) -> Result<()> {
    let graph = args.search.load_graph()?;
    let costing = args.search.costing()?;
    let options = args.search.search_options()?;
    let origin = snap(&graph, parse_coord(&args.from)?, End::Origin)?;
    let destination = snap(&graph, parse_coord(&args.to)?, End::Destination)?;

    let start = Instant::now();
    let route = find_route(&graph, &costing, &origin, &destination, &options)
        .with_context(|| format!("no route from {} to {}", args.from, args.to))?;
    info!(
        cost = route.cost.cost,
        edges = route.edges.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "route found"
    );
    print_json(&RouteOutput::new(&graph, &route))
}

pub fn run_matrix(args: &MatrixArgs) -> Result<()> {
    let graph = args.search.load_graph()?;
    let costing = args.search.costing()?;
    let options = args.search.search_options()?;
    let sources = snap_all(&graph, &args.sources, End::Origin)?;
    let targets = snap_all(&graph, &args.targets, End::Destination)?;

    let start = Instant::now();
    let matrix = cost_matrix(&graph, &costing, &sources, &targets, &options).context("matrix computation failed")?;
    info!(
        sources = matrix.sources,
        targets = matrix.targets,
        reachable = matrix.reachable(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "matrix computed"
    );
    print_json(&MatrixOutput::from(&matrix))
}

pub fn run_isochrone(args: &IsochroneArgs) -> Result<()> {
    let graph = args.search.load_graph()?;
    let costing = args.search.costing()?;
    let options = args.search.search_options()?;
    // arrive_by isochrones collect everything that can reach the locations
    let end = if args.search.arrives() { End::Destination } else { End::Origin };
    let origins = snap_all(&graph, &args.from, end)?;

    let start = Instant::now();
    let result = isochrone(&graph, &costing, &origins, &args.thresholds, &options).context("isochrone failed")?;
    info!(
        contours = result.contours.len(),
        partial = result.partial.is_some(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "isochrone computed"
    );
    print_json(&IsochroneOutput::new(&graph, &result))
}

pub fn run_centroid(args: &CentroidArgs) -> Result<()> {
    let graph = args.search.load_graph()?;
    let costing = args.search.costing()?;
    let options = args.search.search_options()?;
    let locations = snap_all(&graph, &args.locations, End::Origin)?;

    let start = Instant::now();
    let result = centroid(&graph, &costing, &locations, &options).context("no meeting point found")?;
    info!(
        cost = result.cost,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "centroid found"
    );
    print_json(&CentroidOutput::new(&graph, &result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coord() {
        let p = parse_coord("50.85, 4.35").unwrap();
        assert_eq!(p.lat, 50.85);
        assert_eq!(p.lon, 4.35);
        assert!(parse_coord("50.85").is_err());
        assert!(parse_coord("north,4.35").is_err());
        assert!(parse_coord("95.0,4.35").is_err());
    }

    #[test]
    fn test_parse_coords_list() {
        let list = parse_coords("50.0,4.0;51.0,5.0;").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].lon, 5.0);
    }

    #[test]
    fn test_parse_datetime_with_and_without_seconds() {
        assert!(parse_datetime("2024-01-03T08:00").is_ok());
        assert!(parse_datetime("2024-01-03T08:00:30").is_ok());
        assert!(parse_datetime("tomorrow").is_err());
    }

    #[test]
    fn test_flags_override_options() {
        let cli = Cli::try_parse_from([
            "butterfly-route",
            "route",
            "--graph",
            "g.json",
            "--from",
            "0,0",
            "--to",
            "1,1",
            "--max-labels",
            "10",
            "--no-heuristic",
            "--arrive-by",
            "2024-01-03T08:00",
        ])
        .unwrap();
        let Commands::Route(args) = cli.command else {
            panic!("expected route command");
        };
        let options = args.search.search_options().unwrap();
        assert_eq!(options.max_labels, 10);
        assert!(!options.use_heuristic);
        assert_eq!(options.date_time.map(|d| d.kind), Some(DateTimeKind::ArriveBy));
    }

    #[test]
    fn test_depart_and_arrive_conflict() {
        let parsed = Cli::try_parse_from([
            "butterfly-route",
            "route",
            "--graph",
            "g.json",
            "--from",
            "0,0",
            "--to",
            "1,1",
            "--depart-at",
            "2024-01-03T08:00",
            "--arrive-by",
            "2024-01-03T09:00",
        ]);
        assert!(parsed.is_err());
    }
}
