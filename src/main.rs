//! Client Registry conformance harness
//!
//! Validates an HL7v2 Master Patient Index against the OHIE-CR
//! interoperability scenarios over MLLP.

use clap::Parser;
use std::path::PathBuf;

use cr_harness::commands::{self, Commands};
use cr_harness::common::config::Config;
use cr_harness::common::logging;

#[derive(Parser)]
#[command(name = "cr-harness", about = "Client Registry conformance harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./cr-harness.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => commands::dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
