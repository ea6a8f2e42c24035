//! HTTP fetching with bounded retries and exponential backoff.
//!
//! Every outbound GET in the pipeline, listing feeds and detail pages
//! alike, goes through [`FetchClient::fetch_with_retries`]. The client has
//! no shared mutable state beyond `reqwest`'s connection pool and is safe
//! to call concurrently across distinct URLs.
//!
//! # Retry Strategy
//!
//! - A fixed number of attempts (3 by default)
//! - A per-attempt request timeout (5 seconds by default)
//! - Exponential backoff between attempts: `backoff_base * 2^(attempt-1)`,
//!   so 1s, 2s, ... with the defaults; no wait after the final attempt

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// HTTP GET client with a bounded retry budget.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    /// Total number of attempts before giving up.
    retries: usize,
    /// Per-attempt request timeout.
    timeout: Duration,
    /// Initial delay between attempts (doubles with each failure).
    backoff_base: Duration,
}

impl FetchClient {
    /// Create a client with an explicit retry policy.
    pub fn new(retries: usize, timeout: Duration, backoff_base: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            retries,
            timeout,
            backoff_base,
        }
    }

    /// Fetch `url`, returning the body of the first successful response, or
    /// `None` once the retry budget is exhausted.
    ///
    /// A connection error, a timeout, a non-2xx status, and a failed body
    /// read all count as a failed attempt.
    pub async fn fetch_with_retries(&self, url: &str) -> Option<String> {
        let total_t0 = Instant::now();
        for attempt in 1..=self.retries {
            let attempt_t0 = Instant::now();
            match self.get_text(url).await {
                Ok(body) => {
                    debug!(
                        %url,
                        attempt,
                        elapsed_ms = attempt_t0.elapsed().as_millis() as u64,
                        bytes = body.len(),
                        "fetch succeeded"
                    );
                    return Some(body);
                }
                Err(e) => {
                    warn!(
                        %url,
                        attempt,
                        max = self.retries,
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "fetch attempt failed"
                    );
                    if attempt < self.retries {
                        let delay = self.backoff_base.saturating_mul(1 << (attempt - 1));
                        debug!(?delay, "backing off before next attempt");
                        sleep(delay).await;
                    }
                }
            }
        }
        warn!(
            %url,
            retries = self.retries,
            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
            "all fetch attempts exhausted"
        );
        None
    }

    async fn get_text(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        response.text().await
    }
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5), Duration::from_secs(1))
    }
}
