//! Occupancy-Poller main entry point
//!
//! This is the command-line interface for the Occupancy-Poller collector.

use anyhow::Context;
use clap::Parser;
use occupancy_poller::config::{load_settings_with_hash, Settings};
use occupancy_poller::poller::poll;
use occupancy_poller::{Collector, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Occupancy-Poller: a patient occupancy counter logger
///
/// Polls a page showing a live occupancy counter and appends each reading to a
/// CSV log as `value,timestamp`. Runs until killed, or until the page stays
/// unreachable for the whole retry budget.
#[derive(Parser, Debug)]
#[command(name = "occupancy-poller")]
#[command(version)]
#[command(about = "A patient occupancy counter logger", long_about = None)]
struct Cli {
    /// Page to poll
    #[arg(value_name = "URL", required_unless_present = "config")]
    url: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Destination log file (default: <last URL segment>.csv)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Seconds between polls, also used as the retry backoff (default: 600)
    #[arg(short, long, value_name = "SECS")]
    interval: Option<f64>,

    /// Fetch attempts before giving up on the page (default: 100)
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// User-Agent header sent with each request
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Poll once and exit
    #[arg(long)]
    once: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            url: self.url.clone(),
            output: self.output.clone(),
            interval: self.interval,
            max_attempts: self.max_attempts,
            user_agent: self.user_agent.clone(),
            request_timeout: None,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.once {
        let collector =
            Collector::from_config(&config).context("Failed to build the HTTP client")?;
        match collector.poll_once().await? {
            Some(reading) => tracing::info!("Recorded {}", reading),
            None => tracing::info!("No reading recorded"),
        }
        return Ok(());
    }

    poll(config).await?;
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("occupancy_poller=info,warn"),
            1 => EnvFilter::new("occupancy_poller=debug,info"),
            2 => EnvFilter::new("occupancy_poller=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges the configuration file, if any, with command-line settings
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let settings = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (file_settings, hash) = load_settings_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            file_settings.merge(cli.settings())
        }
        None => cli.settings(),
    };

    let config = settings
        .into_config()
        .context("Invalid configuration")?;

    tracing::debug!(
        max_attempts = config.max_attempts,
        user_agent = %config.user_agent,
        "Resolved configuration"
    );

    Ok(config)
}
