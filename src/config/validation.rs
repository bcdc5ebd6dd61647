use crate::config::types::{
    Settings, DEFAULT_INTERVAL_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::ConfigError;
use reqwest::header::HeaderValue;
use std::time::Duration;
use url::Url;

/// Validates the settings, returning the parsed target URL
pub fn validate(settings: &Settings) -> Result<Url, ConfigError> {
    let raw_url = settings.url.as_deref().ok_or(ConfigError::Missing("url"))?;
    let url = validate_url(raw_url)?;

    validate_interval(settings.interval.unwrap_or(DEFAULT_INTERVAL_SECS))?;
    validate_max_attempts(settings.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS))?;
    validate_request_timeout(
        settings
            .request_timeout
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    )?;

    if let Some(user_agent) = &settings.user_agent {
        validate_user_agent(user_agent)?;
    }

    if let Some(output) = &settings.output {
        if output.as_os_str().is_empty() {
            return Err(ConfigError::Validation("output cannot be empty".to_string()));
        }
    }

    Ok(url)
}

/// Validates the target URL: it must parse, use HTTP(S), and name a host
fn validate_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid url '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "url '{}' must use http or https, got '{}'",
            raw,
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "url '{}' has no host",
            raw
        )));
    }

    Ok(url)
}

fn validate_interval(seconds: f64) -> Result<(), ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "interval must be a positive number of seconds, got {}",
            seconds
        )));
    }

    // Rejects values too large to represent as a Duration
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        ConfigError::Validation(format!("interval {} is out of range: {}", seconds, e))
    })?;

    Ok(())
}

fn validate_max_attempts(max_attempts: u32) -> Result<(), ConfigError> {
    if max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            max_attempts
        )));
    }
    Ok(())
}

fn validate_request_timeout(seconds: u64) -> Result<(), ConfigError> {
    if seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1 second, got {}",
            seconds
        )));
    }
    Ok(())
}

/// The user agent must be non-empty and usable as an HTTP header value
fn validate_user_agent(user_agent: &str) -> Result<(), ConfigError> {
    if user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if HeaderValue::from_str(user_agent).is_err() {
        return Err(ConfigError::Validation(format!(
            "user_agent '{}' is not a valid header value",
            user_agent
        )));
    }

    Ok(())
}
