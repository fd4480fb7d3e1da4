use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A configured syndication feed.
///
/// Owned by the administrative side of the system; the ingestion pipeline only
/// ever writes `last_scrape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub rss_url: String,
    pub is_active: bool,
    pub categories: Vec<String>,
    pub scrape_interval_minutes: u32,
    pub last_scrape: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Source {
    pub fn new(name: impl Into<String>, rss_url: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rss_url: rss_url.into(),
            is_active: true,
            categories,
            scrape_interval_minutes: 60,
            last_scrape: None,
            created_at: Utc::now(),
        }
    }

    /// A source is due when it was never scraped or its polling interval has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_scrape {
            Some(last) => last + Duration::minutes(i64::from(self.scrape_interval_minutes)) <= now,
            None => true,
        }
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Lifecycle of an ingested article.
///
/// `Pending` is set on creation. `Published` and `Failed` are terminal for a
/// single summarization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Published,
    Failed,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Published => "published",
            ArticleStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ArticleStatus::Pending)
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ArticleStatus::Pending),
            "published" => Ok(ArticleStatus::Published),
            "failed" => Ok(ArticleStatus::Failed),
            other => Err(format!("unknown article status: {}", other)),
        }
    }
}

/// One ingested item. `url` is unique across the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub source_id: Uuid,
    pub source_name: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub status: ArticleStatus,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub read_time_minutes: u32,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

/// AI-generated enrichment for an article. Never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    pub article_id: Uuid,
    pub executive_summary: String,
    pub key_points: Vec<String>,
    pub analysis: String,
    pub takeaways: Vec<String>,
    pub read_time_minutes: u32,
    /// Built from unparsable model output rather than the structured payload.
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}
