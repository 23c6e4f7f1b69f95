//! `vaccination`: ingest vaccination CSVs as catalog metadata and validate them.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Vaccination metadata ingestion
#[derive(Parser, Debug)]
#[command(name = "vaccination", version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run a recipe: load the CSV, validate it, and write one unit per row to the sink
    Ingest {
        /// Recipe file (TOML)
        #[arg(short, long)]
        recipe: PathBuf,
        /// Override the environment tag
        #[arg(long)]
        env: Option<String>,
        /// Override the CSV location (path or http(s) URL)
        #[arg(long)]
        csv_file_url: Option<String>,
        /// Skip the validation gate even if the recipe configures one
        #[arg(long)]
        no_validate: bool,
    },
    /// Run a checkpoint or a single suite against a CSV
    Validate {
        /// CSV location (path or http(s) URL)
        #[arg(long)]
        csv_file_url: String,
        /// Data context directory
        #[arg(long, default_value = "great_expectations")]
        context_root: PathBuf,
        /// Checkpoint to run
        #[arg(long, conflicts_with = "suite")]
        checkpoint: Option<String>,
        /// Run one expectation suite instead of a checkpoint
        #[arg(long)]
        suite: Option<String>,
        /// HTTP fetch timeout in seconds
        #[arg(long, default_value_t = 60)]
        fetch_timeout_secs: u64,
    },
    /// Manage recipe files
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum RecipeAction {
    /// Write a starter recipe
    Init {
        /// Where to write it
        #[arg(long, default_value = "recipe.toml")]
        path: PathBuf,
    },
    /// Print a recipe after defaults and environment overrides are applied
    Show {
        #[arg(short, long)]
        recipe: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr; stdout carries units and reports.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("org", "vaccination", "vaccination")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "vaccination.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command).await
}
