//! CARTA harness - end-to-end checks for the CARTA image viewer
//!
//! Drives the viewer's web client over WebDriver to verify layout snapshot
//! save/restore, and its scripting port to verify image properties.

use std::path::PathBuf;

use clap::Parser;
use carta_harness::common::{config::Config, logging};
use carta_harness::{cli, commands::Commands};

#[derive(Parser)]
#[command(name = "carta-harness", about = "End-to-end checks for the CARTA viewer")]
#[command(version, long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (default: the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _guard = match &cli.log_file {
        Some(path) => match logging::init_with_file(path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Error: cannot open log file {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => {
            logging::init_cli();
            None
        }
    };

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
