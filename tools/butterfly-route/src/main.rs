use anyhow::Result;
use clap::Parser;

mod bench;
mod cli;
mod generate;
mod logging;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.log_format)?;

    match cli.command {
        Commands::Route(args) => cli::run_route(&args),
        Commands::Matrix(args) => cli::run_matrix(&args),
        Commands::Isochrone(args) => cli::run_isochrone(&args),
        Commands::Centroid(args) => cli::run_centroid(&args),
        Commands::Bench(args) => bench::run_bench(&args),
        Commands::Generate(args) => generate::run_generate(&args),
    }
}
