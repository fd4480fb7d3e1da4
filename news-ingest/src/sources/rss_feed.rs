use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::FeedSource;
use crate::types::{FeedItem, FetchOutcome};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// [`FeedSource`] for RSS/Atom documents served over HTTP.
pub struct RssFeedReader {
    fetcher: Fetcher,
    timeout: Duration,
}

impl RssFeedReader {
    pub fn new(fetcher: Fetcher, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }
}

#[async_trait]
impl FeedSource for RssFeedReader {
    async fn fetch_entries(&self, feed_url: &str) -> FetchOutcome<Vec<FeedItem>> {
        info!("Pulling feed: {}", feed_url);

        let content = match self.fetcher.fetch_text(feed_url, self.timeout).await {
            FetchOutcome::Ready(content) => content,
            FetchOutcome::Absent { reason } => {
                warn!("No feed data from {}: {}", feed_url, reason);
                return FetchOutcome::Absent { reason };
            }
        };

        if !FeedParser::is_valid_feed_content(&content) {
            warn!("Response from {} does not look like RSS or Atom", feed_url);
            return FetchOutcome::absent("response is not a syndication feed");
        }

        let entries = FeedParser::parse_entries(&content);
        info!("Pulled {} entries from {}", entries.len(), feed_url);
        FetchOutcome::Ready(entries)
    }
}
