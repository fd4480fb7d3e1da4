use crate::types::{FetchOutcome, PipelineConfig, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Process-wide HTTP handle shared by the feed reader and the page extractor.
///
/// Built once at startup; each request carries its own total timeout.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and return its body, or `Absent` on any transport error,
    /// non-success status or timeout.
    pub async fn fetch_text(&self, url: &str, timeout: Duration) -> FetchOutcome<String> {
        let start_time = Instant::now();
        debug!("Fetching {} (timeout {:?})", url, timeout);

        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("timed out after {:?}", timeout)
                } else {
                    e.to_string()
                };
                warn!("Request to {} failed: {}", url, reason);
                return FetchOutcome::absent(reason);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Request to {} returned HTTP {}", url, status);
            return FetchOutcome::absent(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ));
        }

        match response.text().await {
            Ok(body) => {
                debug!(
                    "Fetched {} ({} bytes in {}ms)",
                    url,
                    body.len(),
                    start_time.elapsed().as_millis()
                );
                FetchOutcome::Ready(body)
            }
            Err(e) => {
                warn!("Failed to read body from {}: {}", url, e);
                FetchOutcome::absent(e.to_string())
            }
        }
    }
}
