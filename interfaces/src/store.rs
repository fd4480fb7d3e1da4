use crate::defs::{Article, ArticleStatus, Source, Summary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Article with URL already exists: {url}")]
    Duplicate { url: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence surface the ingestion pipeline reads from and writes to.
///
/// Implementations are shared between the orchestrator, the summarization
/// workers and whatever administrative surface sits beside them, so every
/// method takes `&self`.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Active sources, optionally restricted to those tagged with `category`.
    async fn list_active_sources(&self, category: Option<&str>) -> StoreResult<Vec<Source>>;

    async fn insert_source(&self, source: &Source) -> StoreResult<()>;

    async fn count_sources(&self) -> StoreResult<usize>;

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>>;

    async fn find_article_by_id(&self, id: Uuid) -> StoreResult<Option<Article>>;

    /// Fails with [`StoreError::Duplicate`] when the URL is already present.
    async fn insert_article(&self, article: &Article) -> StoreResult<()>;

    async fn update_article_status(&self, id: Uuid, status: ArticleStatus) -> StoreResult<()>;

    async fn update_source_last_scrape(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    async fn insert_summary(&self, summary: &Summary) -> StoreResult<()>;
}
