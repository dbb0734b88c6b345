//! moviecache - search a movie catalog with an offline page cache
//!
//! Pages of search results are cached locally for 24 hours and served from
//! disk when the catalog cannot be reached.

mod app;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use app::App;
use moviecache::cli::{Cli, StartupConfig};

/// Logs go to stderr so command output stays clean on stdout
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("moviecache=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StartupConfig::from_cli(&cli)?;
    let app = App::new(config)?;
    app.run(cli.command).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("moviecache: {e}");
            ExitCode::FAILURE
        }
    }
}
