//! Configuration module for Occupancy-Poller
//!
//! This module handles loading, merging, and validating the collector settings. Settings
//! come from an optional TOML file and from the command line; command-line values win.
//!
//! # Example
//!
//! ```no_run
//! use occupancy_poller::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("poller.toml")).unwrap();
//! println!("Polling {} every {}s", config.url, config.interval.as_secs_f64());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_output_path, default_user_agent, Config, Settings, DEFAULT_INTERVAL_SECS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_settings, load_settings_with_hash};
