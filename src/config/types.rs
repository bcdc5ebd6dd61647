use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default poll period, in seconds
pub const DEFAULT_INTERVAL_SECS: f64 = 600.0;

/// Default number of fetch attempts before giving up on the target
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Default HTTP request timeout, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Returns the `User-Agent` sent when none is configured
pub fn default_user_agent() -> String {
    format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

/// Derives the log file name from the polled URL
///
/// The last non-empty path segment becomes `<segment>.csv`. A URL without path
/// segments falls back to its host name.
///
/// # Example
///
/// ```
/// use occupancy_poller::config::default_output_path;
/// use std::path::PathBuf;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/pools/butte-aux-cailles").unwrap();
/// assert_eq!(default_output_path(&url), PathBuf::from("butte-aux-cailles.csv"));
/// ```
pub fn default_output_path(url: &Url) -> PathBuf {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| "readings".to_string());

    PathBuf::from(format!("{}.csv", segment))
}

/// Raw collector settings as they appear in a TOML file or on the command line
///
/// Every field is optional so that a file and the command line can each provide part
/// of the configuration. [`Settings::into_config`] fills in defaults and validates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// Page to poll
    pub url: Option<String>,

    /// Destination log file
    pub output: Option<PathBuf>,

    /// Poll period and default retry backoff, in seconds
    pub interval: Option<f64>,

    /// Fetch attempts before the target is declared unreachable
    pub max_attempts: Option<u32>,

    /// Identifying `User-Agent` header
    pub user_agent: Option<String>,

    /// HTTP request timeout, in seconds
    pub request_timeout: Option<u64>,
}

impl Settings {
    /// Overlays `other` on top of `self`; values present in `other` win
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            url: other.url.or(self.url),
            output: other.output.or(self.output),
            interval: other.interval.or(self.interval),
            max_attempts: other.max_attempts.or(self.max_attempts),
            user_agent: other.user_agent.or(self.user_agent),
            request_timeout: other.request_timeout.or(self.request_timeout),
        }
    }

    /// Validates the settings and resolves defaults into a [`Config`]
    pub fn into_config(self) -> crate::ConfigResult<Config> {
        let url = super::validation::validate(&self)?;

        let output = self.output.unwrap_or_else(|| default_output_path(&url));
        let interval = Duration::from_secs_f64(self.interval.unwrap_or(DEFAULT_INTERVAL_SECS));
        let request_timeout =
            Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS));

        Ok(Config {
            url,
            output,
            interval,
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            request_timeout,
        })
    }
}

/// Resolved, validated configuration; immutable for the life of the process
#[derive(Debug, Clone)]
pub struct Config {
    /// Page to poll
    pub url: Url,

    /// Destination log file
    pub output: PathBuf,

    /// Poll period and default retry backoff
    pub interval: Duration,

    /// Fetch attempts before the target is declared unreachable
    pub max_attempts: u32,

    /// Identifying `User-Agent` header
    pub user_agent: String,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Config {
    /// Builds a configuration for `url` with every other setting at its default
    pub fn for_url(url: &str) -> crate::ConfigResult<Config> {
        Settings {
            url: Some(url.to_string()),
            ..Settings::default()
        }
        .into_config()
    }
}
