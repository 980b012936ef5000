//! CLI Module
//!
//! Command-line interface for designing and applying equalizers.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Spectreq - equalizer filter design and processing
#[derive(Parser, Debug)]
#[command(name = "spectreq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the parameter shapes an equalizer expects
    #[command(name = "shape")]
    Shape {
        /// Equalizer configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Write an all-zero (flat) parameter file here
        #[arg(short, long)]
        template: Option<PathBuf>,
    },

    /// Print the filters designed from a parameter file
    #[command(name = "design")]
    Design {
        /// Equalizer configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Parameter file (JSON)
        #[arg(short, long)]
        params: PathBuf,
    },

    /// Equalize a WAV file
    #[command(name = "apply")]
    Apply {
        /// Equalizer configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Parameter file (JSON)
        #[arg(short, long)]
        params: PathBuf,

        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        /// Output bit depth: 16, 24 or 32 (float)
        #[arg(short, long, default_value_t = 24)]
        bit_depth: u16,
    },

    /// Equalize several WAV files in parallel with the same parameters
    #[command(name = "batch")]
    Batch {
        /// Equalizer configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Parameter file (JSON)
        #[arg(short, long)]
        params: PathBuf,

        /// Directory for the processed files (same file names as the inputs)
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output bit depth: 16, 24 or 32 (float)
        #[arg(short, long, default_value_t = 24)]
        bit_depth: u16,

        /// Input WAV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}
