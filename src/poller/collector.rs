//! Collector loop - the long-running driver
//!
//! Each round fetches the page (retrying inside the fetcher as needed), looks for a
//! reading, appends it to the log when there is one, and sleeps for the configured
//! interval. Only an exhausted retry budget ends the loop.

use crate::config::Config;
use crate::output::{Reading, Recorder};
use crate::poller::extractor::{extract, Page};
use crate::poller::fetcher::{
    FetchError, Fetcher, HttpClient, HttpResponse, ReqwestClient, RetryPolicy, Sleeper,
    TokioSleeper,
};
use crate::PollerError;
use std::time::Duration;
use url::Url;

/// Drives fetch, extraction, and recording
pub struct Collector<C, S> {
    url: Url,
    fetcher: Fetcher<C, S>,
    recorder: Recorder,
    interval: Duration,
}

impl Collector<ReqwestClient, TokioSleeper> {
    /// Creates a collector that talks to the network and sleeps on the tokio timer
    ///
    /// # Returns
    ///
    /// * `Ok(Collector)` - Ready to run
    /// * `Err(PollerError)` - The HTTP client could not be built
    pub fn from_config(config: &Config) -> Result<Self, PollerError> {
        let client = ReqwestClient::from_config(config)?;
        Ok(Self::new(config, client, TokioSleeper))
    }
}

impl<C: HttpClient, S: Sleeper> Collector<C, S> {
    pub fn new(config: &Config, client: C, sleeper: S) -> Self {
        Self {
            url: config.url.clone(),
            fetcher: Fetcher::new(client, sleeper, RetryPolicy::from_config(config)),
            recorder: Recorder::new(config.output.clone()),
            interval: config.interval,
        }
    }

    /// Runs until the fetcher gives up on the target
    ///
    /// Never returns `Ok`.
    pub async fn run(&self) -> Result<(), PollerError> {
        self.run_limited(None).await.map(|_| ())
    }

    /// Runs `polls` rounds, without sleeping after the last one
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of readings recorded
    /// * `Err(PollerError)` - The fetcher exhausted its retries
    pub async fn run_for(&self, polls: u64) -> Result<u64, PollerError> {
        self.run_limited(Some(polls)).await
    }

    async fn run_limited(&self, limit: Option<u64>) -> Result<u64, PollerError> {
        tracing::info!(
            "Polling {} every {:.1}s, writing to {}",
            self.url,
            self.interval.as_secs_f64(),
            self.recorder.path().display()
        );

        let mut polls = 0u64;
        let mut recorded = 0u64;

        loop {
            if limit.is_some_and(|limit| polls >= limit) {
                tracing::info!("Finished {} polls, {} readings recorded", polls, recorded);
                return Ok(recorded);
            }

            if polls > 0 {
                self.fetcher.sleeper().sleep(self.interval).await;
            }

            match self.poll_once().await {
                Ok(Some(_)) => recorded += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Giving up after {} polls: {}", polls + 1, e);
                    return Err(e.into());
                }
            }
            polls += 1;
        }
    }

    /// Performs one round: fetch, extract, record
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Reading))` - A reading was appended to the log
    /// * `Ok(None)` - No reading this round; the reason has been logged
    /// * `Err(FetchError)` - The page could not be fetched within the retry budget
    pub async fn poll_once(&self) -> Result<Option<Reading>, FetchError> {
        let response = self.fetcher.fetch(self.url.as_str()).await?;

        let Some(value) = self.read_value(&response) else {
            return Ok(None);
        };

        let reading = Reading::now(value);
        match self.recorder.append(&reading) {
            Ok(()) => {
                tracing::info!(value, "Recorded reading");
                Ok(Some(reading))
            }
            Err(e) => {
                tracing::error!("Reading {} lost: {}", reading, e);
                Ok(None)
            }
        }
    }

    fn read_value(&self, response: &HttpResponse) -> Option<u32> {
        match Page::parse(&response.body) {
            Ok(page) => extract(&page),
            Err(e) => {
                tracing::warn!(url = %self.url, "Skipping page: {}", e);
                None
            }
        }
    }
}
