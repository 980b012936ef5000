//! Spectreq CLI
//!
//! Command-line interface for the spectreq equalizers.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use spectreq::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Spectreq v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Shape { config, template } => commands::shape(&config, template.as_deref()),
        Commands::Design { config, params } => commands::design(&config, &params),
        Commands::Apply {
            config,
            params,
            input,
            output,
            bit_depth,
        } => commands::apply(&config, &params, &input, &output, bit_depth),
        Commands::Batch {
            config,
            params,
            output_dir,
            bit_depth,
            inputs,
        } => commands::batch(&config, &params, &inputs, &output_dir, bit_depth),
    }
}
