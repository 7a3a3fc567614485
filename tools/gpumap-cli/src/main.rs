//! gpumap CLI: inspect display adapters, their outputs and the probes behind them.
//!
//! Usage:
//!   gpumap list [--json]                 List adapters and their outputs
//!   gpumap check                         Report probe availability
//!   gpumap find --name <DISPLAY>         Look up an output by device name
//!   gpumap find --hardware-id <HI:LO>    Look up an adapter by hardware id
//!   gpumap primary                       Show the primary output

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gpumap_platform_core::HardwareId;

mod commands;

#[derive(Parser)]
#[command(
    name = "gpumap",
    about = "Display adapter and output discovery",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use a synthetic system description (JSON) instead of the host
    #[arg(long, global = true, value_name = "PATH")]
    synthetic: Option<PathBuf>,

    /// Configuration file (defaults to the standard location)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List adapters and their outputs
    List {
        /// Print the registry snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check probe availability and registry initialization
    Check {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up an output by name or an adapter by hardware id
    Find {
        /// Output device name (exact, case-sensitive)
        #[arg(long, conflicts_with = "hardware_id", required_unless_present = "hardware_id")]
        name: Option<String>,

        /// Adapter hardware id as `high:low` in hex
        #[arg(long)]
        hardware_id: Option<HardwareId>,
    },

    /// Show the primary output
    Primary,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ctx = commands::Context::load(cli.config, cli.synthetic)?;

    let mut logging = ctx.config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    gpumap_common::logging::init_logging(&logging);

    match cli.command {
        Commands::List { json } => commands::list::run(&ctx, json),
        Commands::Check { json } => commands::check::run(&ctx, json),
        Commands::Find { name, hardware_id } => commands::find::run(&ctx, name, hardware_id),
        Commands::Primary => commands::primary::run(&ctx),
    }
}
