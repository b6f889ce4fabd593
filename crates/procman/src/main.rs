//! procman: interactive process manager
//!
//! Loads the process registry from disk, runs the command menu over a
//! fresh dispatch queue and memory stack, and saves the registry on exit.

mod config;
mod menu;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use procman_registry::ProcessRegistry;
use session::Session;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "procman", version, about = "Process registry with a priority dispatch queue")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "PROCMAN_CONFIG")]
    config: Option<PathBuf>,

    /// Process data file, overrides the configured one
    #[arg(long)]
    data: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_file = data;
    }

    // Initialize logging on stderr so it never mixes with menu output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    info!("procman starting...");

    let mut registry = ProcessRegistry::new();
    let report = registry
        .load(&config.data_file)
        .with_context(|| format!("loading {}", config.data_file.display()))?;
    if report.skipped() > 0 {
        warn!(
            "Ignored {} malformed lines in {}: {:?}",
            report.skipped(),
            config.data_file.display(),
            report.skipped_lines
        );
    }

    let mut session = Session::new(registry);
    menu::run(&mut session, &config, io::stdin().lock(), io::stdout().lock())?;

    if config.autosave {
        session
            .registry
            .save(&config.data_file)
            .with_context(|| format!("saving {}", config.data_file.display()))?;
    }

    info!("procman shutting down");
    Ok(())
}
