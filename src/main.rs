//! predmaint - CSV ingestion watcher and machine-failure inference API.
//!
//! Usage:
//!   predmaint serve
//!   predmaint watch
//!   predmaint run-once
//!   predmaint clean data/batch.csv

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use predmaint_lib::app;
use predmaint_lib::infrastructure::config::{Settings, DEFAULT_CONFIG_PATH};

#[derive(Parser, Debug)]
#[command(name = "predmaint", version)]
#[command(about = "CSV ingestion watcher and machine-failure inference API")]
struct Args {
    /// Path to the TOML configuration file (optional)
    #[arg(long, env = "PREDMAINT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the model and serve the inference API
    Serve,
    /// Promote incoming CSV files on a fixed schedule
    Watch,
    /// Run a single promotion and exit
    RunOnce,
    /// Clean a local CSV file in place
    Clean { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    app::init_tracing();

    let args = Args::parse();
    let settings = match Settings::load_from(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!(config = %args.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Serve => app::serve(&settings).await,
        Command::Watch => {
            app::watch(&settings, async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                }
            })
            .await
        }
        Command::RunOnce => app::run_once(&settings).await.map(|outcome| {
            info!(outcome = %outcome, "Run finished");
        }),
        Command::Clean { path } => app::clean_local(&settings, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Exiting with error");
            ExitCode::FAILURE
        }
    }
}
