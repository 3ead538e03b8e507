//! Binary entry point for waypoint.
//!
//! This binary provides a command line view of the navigation history kept
//! by the waypoint library.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    cmd_clear, cmd_config, cmd_history, cmd_parcel, cmd_recent, cmd_resolve, cmd_trim, cmd_typed,
    cmd_visit,
};
use std::process::ExitCode;
use waypoint::config::WaypointConfig;
use waypoint::observability::{self, InitOptions};

/// Waypoint - navigation history for virtual world viewers.
#[derive(Parser)]
#[command(name = "waypoint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Show the teleport history.
    History {
        /// Group entries by how many days ago they were visited.
        #[arg(short, long)]
        buckets: bool,
    },

    /// Show recently visited places, newest first.
    Recent,

    /// Show address bar history.
    Typed {
        /// Only show entries containing this text.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Drop teleport history older than the given age.
    Trim {
        /// Maximum age in days (defaults to the configured retention).
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Clear all history lists.
    Clear,

    /// Go to an address and record the arrival.
    Visit {
        /// Region name, `Region/x/y/z`, or a SLURL.
        address: String,

        /// Seconds to wait for a region lookup.
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Resolve an address without recording anything.
    Resolve {
        /// Region name, `Region/x/y/z`, or a SLURL.
        address: String,

        /// Seconds to wait for a region lookup.
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Fetch details of a parcel.
    Parcel {
        /// Parcel id (UUID).
        id: String,

        /// Seconds to wait for the grid.
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },

    /// Show configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(
        &config.logging,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(cli: Cli, config: WaypointConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::History { buckets } => cmd_history(config, buckets),

        Commands::Recent => cmd_recent(config),

        Commands::Typed { filter } => cmd_typed(config, filter.as_deref()),

        Commands::Trim { days } => cmd_trim(config, days),

        Commands::Clear => cmd_clear(config),

        Commands::Visit { address, timeout } => cmd_visit(config, &address, timeout).await,

        Commands::Resolve { address, timeout } => cmd_resolve(config, &address, timeout).await,

        Commands::Parcel { id, timeout } => cmd_parcel(&config, &id, timeout).await,

        Commands::Config { show } => cmd_config(&config, show),
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> Result<WaypointConfig, Box<dyn std::error::Error>> {
    if let Some(config_path) = path {
        return WaypointConfig::load_from_file(std::path::Path::new(config_path))
            .map_err(std::convert::Into::into);
    }

    // Environment override for config path
    if let Ok(config_path) = std::env::var("WAYPOINT_CONFIG_PATH") {
        if !config_path.trim().is_empty() {
            return WaypointConfig::load_from_file(std::path::Path::new(&config_path))
                .map_err(std::convert::Into::into);
        }
    }

    Ok(WaypointConfig::load_default())
}
