// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "pyramid-denoise")]
#[command(about = "Multiscale GPU denoiser for photographs")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Denoise an image file
    Denoise {
        /// Input image (any format the image crate decodes)
        input: PathBuf,

        /// Output image; the format follows the extension
        output: PathBuf,

        /// JSON config with noise model and per-level parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pyramid depth (overrides the config)
        #[arg(short, long)]
        levels: Option<usize>,

        /// Write every intermediate stage as PNG into this directory
        #[arg(long)]
        dump_stages: Option<PathBuf>,
    },

    /// Show the GPU adapter and kernel setup
    Info,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=pyramid_denoise=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Denoise {
            input,
            output,
            config,
            levels,
            dump_stages,
        } => cli::denoise_file(cli::DenoiseArgs {
            input,
            output,
            config,
            levels,
            dump_stages,
        }),
        Commands::Info => cli::show_info(),
    }
}
