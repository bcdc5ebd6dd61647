//! Occupancy-Poller: a patient occupancy counter logger
//!
//! This crate implements a long-running collector that polls a public web page showing a
//! live occupancy counter, extracts the current value, and appends timestamped readings
//! to a CSV log.

pub mod config;
pub mod output;
pub mod poller;

use thiserror::Error;

/// Main error type for Occupancy-Poller operations
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] poller::FetchError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Result type alias for Occupancy-Poller operations
pub type Result<T> = std::result::Result<T, PollerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use output::{Reading, Recorder};
pub use poller::{extract, Collector, Fetcher, Page, ReqwestClient, TokioSleeper};
