use crate::config::types::{Config, Settings};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads raw settings from a TOML file without resolving defaults
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Settings)` - Successfully parsed settings
/// * `Err(ConfigError)` - Failed to read or parse the file
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}

/// Loads, validates, and resolves a configuration file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use occupancy_poller::config::load_config;
///
/// let config = load_config(Path::new("poller.toml")).unwrap();
/// println!("Writing readings to {}", config.output.display());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_settings(path)?.into_config()
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that a long-running collector can be matched to the file it
/// was started with.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads raw settings and returns them along with the file hash
pub fn load_settings_with_hash(path: &Path) -> Result<(Settings, String), ConfigError> {
    let settings = load_settings(path)?;
    let hash = compute_config_hash(path)?;
    Ok((settings, hash))
}
