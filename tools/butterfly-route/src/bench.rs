//! Route query benchmark
//!
//! Draws random node pairs, answers them on a rayon pool and reports
//! per-query latency from an HDR histogram.

use anyhow::{bail, Context, Result};
use butterfly_routing::{find_route, GraphId, Location, SearchError};
use clap::Args;
use hdrhistogram::Histogram;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::cli::SearchArgs;

#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Number of random queries
    #[arg(long, default_value = "1000")]
    pub queries: usize,

    /// Worker threads (0 = one per core)
    #[arg(long, default_value = "0")]
    pub threads: usize,

    #[arg(long, default_value = "42")]
    pub seed: u64,
}

struct Outcome {
    micros: u64,
    result: std::result::Result<usize, SearchError>,
}

pub fn run_bench(args: &BenchArgs) -> Result<()> {
    let graph = args.search.load_graph()?;
    let costing = args.search.costing()?;
    let options = args.search.search_options()?;

    let nodes: Vec<GraphId> = graph.nodes().map(|n| n.id).collect();
    if nodes.len() < 2 {
        bail!("graph needs at least two nodes to benchmark");
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let queries: Vec<(Location, Location)> = (0..args.queries)
        .filter_map(|_| {
            let from = *nodes.choose(&mut rng)?;
            let to = *nodes.choose(&mut rng)?;
            Some((graph.origin_at(from)?, graph.destination_at(to)?))
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
        .context("failed to build worker pool")?;

    println!("═══════════════════════════════════════════════════════════════");
    println!("  ROUTE BENCHMARK");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Graph: {}", args.search.graph.display());
    println!("  Nodes: {}", format_number(graph.node_count() as u64));
    println!("  Edges: {}", format_number(graph.edge_count() as u64));
    println!("  Queries: {}", queries.len());
    println!("  Threads: {}", pool.current_num_threads());
    println!("  Heuristic: {}", options.use_heuristic);
    println!();

    let wall = Instant::now();
    let outcomes: Vec<Outcome> = pool.install(|| {
        queries
            .par_iter()
            .map(|(origin, destination)| {
                let start = Instant::now();
                let result = find_route(&graph, &costing, origin, destination, &options).map(|r| r.edges.len());
                Outcome {
                    micros: start.elapsed().as_micros() as u64,
                    result,
                }
            })
            .collect()
    });
    let wall = wall.elapsed();

    let mut hist = Histogram::<u64>::new(3)?;
    let mut found = 0u64;
    let mut no_path = 0u64;
    let mut failed = 0u64;
    let mut edges = 0u64;
    for outcome in &outcomes {
        hist.record(outcome.micros.max(1))?;
        match &outcome.result {
            Ok(n) => {
                found += 1;
                edges += *n as u64;
            }
            Err(SearchError::NoPathFound) => no_path += 1,
            Err(e) => {
                failed += 1;
                warn!(error = %e, "query failed");
            }
        }
    }

    print_histogram_stats("Route", &hist);
    println!("───────────────────────────────────────────────────────────────");
    println!("  Results");
    println!("───────────────────────────────────────────────────────────────");
    println!("    found:     {:>10}", format_number(found));
    println!("    no path:   {:>10}", format_number(no_path));
    println!("    failed:    {:>10}", format_number(failed));
    if found > 0 {
        println!("    avg edges: {:>10.1}", edges as f64 / found as f64);
    }
    println!("    wall:      {:>10.2} s", wall.as_secs_f64());
    println!("    throughput:{:>10.1} q/s", throughput(outcomes.len(), wall));
    Ok(())
}

fn throughput(queries: usize, wall: Duration) -> f64 {
    let secs = wall.as_secs_f64();
    if secs > 0.0 {
        queries as f64 / secs
    } else {
        0.0
    }
}

fn print_histogram_stats(name: &str, hist: &Histogram<u64>) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {} timing (μs)", name);
    println!("───────────────────────────────────────────────────────────────");
    println!("    min:    {:>10.0}", hist.min() as f64);
    println!("    p50:    {:>10.0}", hist.value_at_quantile(0.50) as f64);
    println!("    p90:    {:>10.0}", hist.value_at_quantile(0.90) as f64);
    println!("    p99:    {:>10.0}", hist.value_at_quantile(0.99) as f64);
    println!("    max:    {:>10.0}", hist.max() as f64);
    println!("    mean:   {:>10.1}", hist.mean());
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
