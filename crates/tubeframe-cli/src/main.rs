//! Tubeframe CLI - demo host for the embedded player bridge
//!
//! Features:
//! - Player option encoding
//! - Host page rendering
//! - Sample video catalog
//! - Headless demo session against a simulated runtime

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod catalog;
mod commands;
mod config;
mod output;
mod simulator;

use config::PlayerArgs;

/// Tubeframe CLI - embedded YouTube player bridge
#[derive(Parser)]
#[command(name = "tubeframe")]
#[command(author = "tubeframe contributors")]
#[command(version)]
#[command(about = "Drive an embedded YouTube IFrame player from native code", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the encoded player options
    Options {
        #[command(flatten)]
        player: PlayerArgs,
    },

    /// Render the host page
    Page {
        #[command(flatten)]
        player: PlayerArgs,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List bundled sample videos
    Catalog,

    /// Run a headless session against a simulated runtime
    Demo {
        /// Video to load once the player is ready
        #[arg(default_value = "uHq9km2E6rk")]
        video_id: String,

        /// Start position in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// How long to run, in seconds
        #[arg(short, long, default_value = "3")]
        seconds: u64,

        #[command(flatten)]
        player: PlayerArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    tubeframe_core::init();

    match cli.command {
        Commands::Options { player } => {
            commands::options(&player, &cli.format)?;
        }
        Commands::Page { player, output } => {
            commands::page(&player, output)?;
        }
        Commands::Catalog => {
            commands::catalog(&cli.format)?;
        }
        Commands::Demo { video_id, start, seconds, player } => {
            commands::demo(&video_id, start, seconds, &player, &cli.format).await?;
        }
    }

    Ok(())
}
