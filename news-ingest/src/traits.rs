use crate::types::{ExtractedContent, FeedItem, FetchOutcome};
use async_trait::async_trait;

/// Retrieves and parses one syndication document.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in document order. Never fails: an unreachable or unreadable
    /// feed comes back as [`FetchOutcome::Absent`].
    async fn fetch_entries(&self, feed_url: &str) -> FetchOutcome<Vec<FeedItem>>;
}

/// Turns an article URL into readable text, an excerpt and a lead image.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, article_url: &str) -> FetchOutcome<ExtractedContent>;
}
