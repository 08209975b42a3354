//! Synthetic street grid for trying out and benchmarking the search core
//!
//! Every fifth street is an arterial on level 1 with rush-hour congestion;
//! the rest are local streets on level 2, some of them one-way.

use anyhow::{bail, Context, Result};
use butterfly_routing::graph::{EdgeSpec, NodeSpec};
use butterfly_routing::{GraphSpec, LatLng};
use clap::Args;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

use crate::cli::parse_coord;

const METERS_PER_DEGREE: f64 = 111_320.0;
const ARTERIAL_EVERY: u64 = 5;
const ARTERIAL_SPEED_KPH: f32 = 70.0;
const LOCAL_SPEEDS_KPH: [f32; 3] = [30.0, 30.0, 50.0];

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, default_value = "20")]
    pub rows: u64,

    #[arg(long, default_value = "20")]
    pub cols: u64,

    /// Distance between parallel streets in meters
    #[arg(long, default_value = "100")]
    pub spacing_m: f64,

    /// South-west corner (lat,lon)
    #[arg(long, default_value = "50.85,4.35")]
    pub corner: String,

    /// Share of local streets that are one-way
    #[arg(long, default_value = "0.1")]
    pub oneway: f64,

    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output graph file (JSON)
    #[arg(short, long)]
    pub output: PathBuf,
}

pub fn run_generate(args: &GenerateArgs) -> Result<()> {
    let corner = parse_coord(&args.corner)?;
    let spec = grid_spec(args, corner)?;

    let file = File::create(&args.output).with_context(|| format!("failed to create {}", args.output.display()))?;
    serde_json::to_writer(BufWriter::new(file), &spec)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        nodes = spec.nodes.len(),
        edges = spec.edges.len(),
        "grid written"
    );
    Ok(())
}

pub fn grid_spec(args: &GenerateArgs, corner: LatLng) -> Result<GraphSpec> {
    if args.rows < 2 || args.cols < 2 {
        bail!("grid needs at least 2 rows and 2 columns");
    }
    if !(0.0..=1.0).contains(&args.oneway) {
        bail!("--oneway must be between 0 and 1, got {}", args.oneway);
    }
    if args.spacing_m.is_nan() || args.spacing_m <= 0.0 {
        bail!("--spacing-m must be positive");
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let dlat = args.spacing_m / METERS_PER_DEGREE;
    let dlon = args.spacing_m / (METERS_PER_DEGREE * corner.lat.to_radians().cos().max(0.01));
    let id = |row: u64, col: u64| row * args.cols + col + 1;

    let mut spec = GraphSpec::default();
    for row in 0..args.rows {
        for col in 0..args.cols {
            let mut node = NodeSpec::new(
                id(row, col),
                corner.lat + row as f64 * dlat,
                corner.lon + col as f64 * dlon,
            );
            node.signal = row % ARTERIAL_EVERY == 0 && col % ARTERIAL_EVERY == 0;
            spec.nodes.push(node);
        }
    }

    let street = |from: u64, to: u64, arterial: bool, rng: &mut StdRng| {
        if arterial {
            let mut edge = EdgeSpec::new(from, to).speed(ARTERIAL_SPEED_KPH).level(1);
            edge.congested_speed = Some(ARTERIAL_SPEED_KPH / 2.0);
            return edge;
        }
        let speed = *LOCAL_SPEEDS_KPH.choose(rng).unwrap_or(&LOCAL_SPEEDS_KPH[0]);
        let edge = EdgeSpec::new(from, to).speed(speed);
        if rng.random_bool(args.oneway) {
            if rng.random_bool(0.5) {
                EdgeSpec { from: to, to: from, ..edge }.oneway()
            } else {
                edge.oneway()
            }
        } else {
            edge
        }
    };

    for row in 0..args.rows {
        for col in 0..args.cols {
            if col + 1 < args.cols {
                let edge = street(id(row, col), id(row, col + 1), row % ARTERIAL_EVERY == 0, &mut rng);
                spec.edges.push(edge);
            }
            if row + 1 < args.rows {
                let edge = street(id(row, col), id(row + 1, col), col % ARTERIAL_EVERY == 0, &mut rng);
                spec.edges.push(edge);
            }
        }
    }
    Ok(spec)
}
