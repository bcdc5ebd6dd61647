//! Poller module for fetching the counter page and logging readings
//!
//! This module contains the core polling logic, including:
//! - HTTP fetching with a bounded retry loop
//! - Counter extraction from the parsed page
//! - The collector loop tying fetching, extraction, and recording together

mod collector;
mod extractor;
mod fetcher;

#[cfg(test)]
mod testing;

pub use collector::Collector;
pub use extractor::{
    classify, extract, CounterElement, DocumentError, ElementQuery, Extraction, Page,
    COUNTER_NAME, FORECAST_ATTR, VALUE_ATTR,
};
pub use fetcher::{
    build_http_client, parse_retry_after, FetchError, FetchFailure, Fetcher, HttpClient,
    HttpResponse, ReqwestClient, RetryPolicy, Sleeper, TokioSleeper, TransportError,
};

use crate::config::Config;
use crate::PollerError;

/// Runs the collector described by `config` until the target becomes unreachable
///
/// This is the main entry point for a polling session. It will:
/// 1. Build the HTTP client
/// 2. Fetch the page, retrying transient failures
/// 3. Extract the live counter value
/// 4. Append it to the output log
/// 5. Sleep for the interval and repeat
///
/// # Returns
///
/// * `Err(PollerError)` - The client could not be built, or the retry budget ran out
pub async fn poll(config: Config) -> Result<(), PollerError> {
    Collector::from_config(&config)?.run().await
}
