//! HTTP fetcher implementation
//!
//! This module handles every HTTP request the poller makes, including:
//! - The [`HttpClient`] capability and its `reqwest` implementation
//! - Classification of each attempt (transport failure, rate limit, bad status)
//! - The bounded retry loop with a fixed backoff and `Retry-After` override

use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on the time spent establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A complete HTTP response: status, headers, and the decoded body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: StatusCode,

    /// Response headers
    pub headers: HeaderMap,

    /// Body decoded as text
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with no headers
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header, replacing any previous value
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns a header as text, if present and valid UTF-8
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Client-side failure to obtain any response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS handshake failure
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Capability to perform a single GET request
///
/// Implementations return any response the server sent, whatever its status;
/// only failures to obtain a response are errors.
pub trait HttpClient {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Capability to pause the poller
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Builds an HTTP client with the identifying user agent
///
/// # Arguments
///
/// * `user_agent` - Value of the `User-Agent` header sent with every request
/// * `timeout` - Total time allowed for one request
///
/// # Example
///
/// ```no_run
/// use occupancy_poller::poller::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("occupancy-poller/1.0", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`HttpClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Creates a client sending `user_agent` with every request
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }

    /// Creates a client from the user agent and timeout in `config`
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(&config.user_agent, config.request_timeout)
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Why a single fetch attempt did not produce a usable page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// No response was obtained
    Transport(TransportError),

    /// HTTP 429, with the server's `Retry-After` hint when it is a whole number of seconds
    RateLimited { retry_after: Option<Duration> },

    /// Any other status than 200
    Status(StatusCode),
}

impl FetchFailure {
    /// Classifies the outcome of one attempt
    ///
    /// Only status 200 counts as success.
    pub fn classify(
        outcome: Result<HttpResponse, TransportError>,
    ) -> Result<HttpResponse, FetchFailure> {
        let response = outcome.map_err(FetchFailure::Transport)?;

        match response.status {
            StatusCode::OK => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchFailure::RateLimited {
                retry_after: parse_retry_after(&response.headers),
            }),
            status => Err(FetchFailure::Status(status)),
        }
    }

    /// Time to wait before the next attempt
    pub fn backoff(&self, default: Duration) -> Duration {
        match self {
            FetchFailure::RateLimited {
                retry_after: Some(retry_after),
            } => *retry_after,
            _ => default,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Transport(e) => write!(f, "transport error: {}", e),
            FetchFailure::RateLimited {
                retry_after: Some(retry_after),
            } => write!(
                f,
                "rate limited (HTTP 429, retry after {}s)",
                retry_after.as_secs()
            ),
            FetchFailure::RateLimited { retry_after: None } => {
                write!(f, "rate limited (HTTP 429)")
            }
            FetchFailure::Status(status) => write!(f, "unexpected status {}", status),
        }
    }
}

/// Reads `Retry-After` as a whole number of seconds
///
/// HTTP-date values and anything else that is not a non-negative integer are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// The one unrecoverable fetch outcome
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("retries exhausted for {url} after {attempts} attempts (last failure: {last_failure})")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_failure: FetchFailure,
    },
}

/// Retry budget and backoff for a [`Fetcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed per fetch, including the first
    pub max_attempts: u32,

    /// Wait between attempts unless the server asks for another delay
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: config.interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_secs_f64(crate::config::DEFAULT_INTERVAL_SECS),
        }
    }
}

/// Fetches a page, retrying until it gets a 200 or runs out of attempts
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 200 | Return the response |
/// | HTTP 429 with integer `Retry-After` | Wait `Retry-After` seconds, retry |
/// | Any other status | Wait the backoff, retry |
/// | Transport error | Wait the backoff, retry |
/// | `max_attempts` failures | [`FetchError::RetriesExhausted`] |
pub struct Fetcher<C, S> {
    client: C,
    sleeper: S,
    policy: RetryPolicy,
}

impl<C: HttpClient, S: Sleeper> Fetcher<C, S> {
    pub fn new(client: C, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            client,
            sleeper,
            policy,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The sleeper used between attempts
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Fetches `url`, absorbing transient failures
    ///
    /// # Returns
    ///
    /// * `Ok(HttpResponse)` - A response with status 200
    /// * `Err(FetchError)` - Every one of `max_attempts` attempts failed
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let mut failed = 0u32;

        loop {
            let failure = match FetchFailure::classify(self.client.get(url).await) {
                Ok(response) => {
                    if failed > 0 {
                        tracing::info!(url, failed, "Fetch recovered");
                    }
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            failed += 1;
            tracing::warn!(
                url,
                attempt = failed,
                max_attempts = self.policy.max_attempts,
                "Fetch failed: {}",
                failure
            );

            if failed >= self.policy.max_attempts {
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: failed,
                    last_failure: failure,
                });
            }

            let backoff = failure.backoff(self.policy.backoff);
            tracing::debug!(url, "Retrying in {:.1}s", backoff.as_secs_f64());
            self.sleeper.sleep(backoff).await;
        }
    }
}
