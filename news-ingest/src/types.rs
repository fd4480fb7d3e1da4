use chrono::{DateTime, Utc};
use interfaces::StoreError;
use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub user_agent: String,
    pub feed_timeout_seconds: u64,
    pub page_timeout_seconds: u64,
    pub max_redirects: usize,
    pub max_entries_per_run: usize,
    pub max_sources_per_request: usize,
    pub summary_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_agent: "News-Ingest/0.1".to_string(),
            feed_timeout_seconds: 30,
            page_timeout_seconds: 20,
            max_redirects: 5,
            max_entries_per_run: 10,
            max_sources_per_request: 5,
            summary_concurrency: 4,
        }
    }
}

/// Result of a network step that is allowed to come back empty-handed.
///
/// Unreachable hosts, bad statuses, timeouts and unparsable bodies all collapse
/// into `Absent`; the reason is kept for logging only.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Ready(T),
    Absent { reason: String },
}

impl<T> FetchOutcome<T> {
    pub fn absent(reason: impl Into<String>) -> Self {
        FetchOutcome::Absent { reason: reason.into() }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FetchOutcome::Absent { .. })
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            FetchOutcome::Ready(value) => Some(value),
            FetchOutcome::Absent { .. } => None,
        }
    }
}

/// Media reference attached to a feed entry (media:content, enclosure, thumbnail).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRef {
    pub url: String,
    pub content_type: Option<String>,
}

/// One entry of a parsed feed. Optional fields are resolved once here and
/// carry their absence downstream as `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    /// `None` when the entry had no usable link.
    pub link: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub media: Vec<MediaRef>,
}

impl FeedItem {
    pub fn primary_media_url(&self) -> Option<&str> {
        self.media.first().map(|m| m.url.as_str())
    }
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedItem>,
    /// Set when the document only parsed after trimming a damaged tail.
    pub recovered: bool,
}

/// Readable content derived from an article page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeStatus {
    Success,
    NoEntries,
    Error(String),
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeStatus::Success => f.write_str("success"),
            ScrapeStatus::NoEntries => f.write_str("no_entries"),
            ScrapeStatus::Error(cause) => write!(f, "error: {}", cause),
        }
    }
}

impl Serialize for ScrapeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one orchestrator run against one source.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub source_id: Uuid,
    pub source_name: String,
    pub articles_found: usize,
    pub articles_added: usize,
    pub status: ScrapeStatus,
    pub added_article_ids: Vec<Uuid>,
}

impl ScrapeResult {
    pub fn new(source_id: Uuid, source_name: &str, status: ScrapeStatus) -> Self {
        Self {
            source_id,
            source_name: source_name.to_string(),
            articles_found: 0,
            articles_added: 0,
            status,
            added_article_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeRequest {
    pub category: Option<String>,
    pub due_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeBatch {
    pub results: Vec<ScrapeResult>,
    /// Number of matching sources before the per-request cap was applied.
    pub total_sources: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Article not found: {id}")]
    ArticleNotFound { id: Uuid },

    #[error("Article {id} has no content to summarize")]
    NoContent { id: Uuid },

    #[error("Summarization already running for article {id}")]
    SummaryInProgress { id: Uuid },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("No active sources found")]
    NoActiveSources,

    #[error("Summary queue is closed")]
    QueueClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
