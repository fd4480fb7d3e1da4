use crate::types::Result;
use interfaces::ArticleStore;
use std::sync::Arc;
use tracing::debug;

/// Checks candidate URLs against already-ingested articles before any page
/// is downloaded.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn ArticleStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// `true` when no article with exactly this URL exists yet.
    pub async fn is_new(&self, url: &str) -> Result<bool> {
        let existing = self.store.find_article_by_url(url).await?;
        if existing.is_some() {
            debug!("Skipping already ingested URL: {}", url);
        }
        Ok(existing.is_none())
    }
}
