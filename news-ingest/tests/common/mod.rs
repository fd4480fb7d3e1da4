#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::{Article, ArticleStatus, ArticleStore, Source, StoreError, StoreResult, Summary};
use news_ingest::{
    ExtractedContent, FeedItem, FeedSource, FetchOutcome, Fetcher, InMemoryStore, PageExtractor,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Serve `status` + `body` to every connection on a random local port after
/// waiting `delay`. Returns the base URL.
pub async fn serve(status: u16, content_type: &str, body: &str, delay: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    );

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Fetcher that talks to the local test server directly, ignoring any proxy
/// configured in the environment.
pub fn local_fetcher() -> Fetcher {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap();
    Fetcher::with_client(client)
}

pub fn feed_item(link: &str, title: &str) -> FeedItem {
    FeedItem {
        link: Some(link.to_string()),
        title: Some(title.to_string()),
        author: None,
        published_at: None,
        media: Vec::new(),
    }
}

pub fn source(name: &str, rss_url: &str, categories: &[&str]) -> Source {
    Source::new(name, rss_url, categories.iter().map(|c| c.to_string()).collect())
}

pub fn pending_article(url: &str, content: Option<&str>) -> Article {
    Article {
        id: Uuid::new_v4(),
        title: "Test article".to_string(),
        url: url.to_string(),
        source_id: Uuid::new_v4(),
        source_name: "Test Source".to_string(),
        content: content.map(str::to_string),
        excerpt: None,
        image_url: None,
        author: None,
        published_at: None,
        status: ArticleStatus::Pending,
        categories: Vec::new(),
        tags: Vec::new(),
        read_time_minutes: 1,
        created_at: Utc::now(),
    }
}

/// Feed source answering from a fixed map of feed URL to entries. Unknown
/// URLs are absent.
#[derive(Default)]
pub struct StaticFeeds {
    feeds: HashMap<String, Vec<FeedItem>>,
    pub calls: AtomicUsize,
}

impl StaticFeeds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, entries: Vec<FeedItem>) -> Self {
        self.feeds.insert(url.to_string(), entries);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn fetch_entries(&self, feed_url: &str) -> FetchOutcome<Vec<FeedItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.feeds.get(feed_url) {
            Some(entries) => FetchOutcome::Ready(entries.clone()),
            None => FetchOutcome::absent("unknown feed"),
        }
    }
}

/// Page extractor answering from a fixed map; records every URL it is asked
/// for. Unknown pages get a short generic body.
#[derive(Default)]
pub struct StaticPages {
    pages: HashMap<String, FetchOutcome<ExtractedContent>>,
    pub requested: Mutex<Vec<String>>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: ExtractedContent) -> Self {
        self.pages.insert(url.to_string(), FetchOutcome::Ready(page));
        self
    }

    pub fn with_absent(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), FetchOutcome::absent("HTTP 404"));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageExtractor for StaticPages {
    async fn extract(&self, article_url: &str) -> FetchOutcome<ExtractedContent> {
        self.requested.lock().unwrap().push(article_url.to_string());
        match self.pages.get(article_url) {
            Some(page) => page.clone(),
            None => FetchOutcome::Ready(ExtractedContent {
                content: Some(format!("Body of {}", article_url)),
                excerpt: Some(format!("Body of {}", article_url)),
                image_url: None,
            }),
        }
    }
}

/// Wraps an [`InMemoryStore`] and fails selected operations.
pub struct FlakyStore {
    pub inner: Arc<InMemoryStore>,
    pub fail_summary_insert: bool,
    pub fail_last_scrape: bool,
    pub fail_article_urls: Vec<String>,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            fail_summary_insert: false,
            fail_last_scrape: false,
            fail_article_urls: Vec::new(),
        }
    }
}

#[async_trait]
impl ArticleStore for FlakyStore {
    async fn list_active_sources(&self, category: Option<&str>) -> StoreResult<Vec<Source>> {
        self.inner.list_active_sources(category).await
    }

    async fn insert_source(&self, source: &Source) -> StoreResult<()> {
        self.inner.insert_source(source).await
    }

    async fn count_sources(&self) -> StoreResult<usize> {
        self.inner.count_sources().await
    }

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        self.inner.find_article_by_url(url).await
    }

    async fn find_article_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
        self.inner.find_article_by_id(id).await
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<()> {
        if self.fail_article_urls.contains(&article.url) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.insert_article(article).await
    }

    async fn update_article_status(&self, id: Uuid, status: ArticleStatus) -> StoreResult<()> {
        self.inner.update_article_status(id, status).await
    }

    async fn update_source_last_scrape(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        if self.fail_last_scrape {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.update_source_last_scrape(id, at).await
    }

    async fn insert_summary(&self, summary: &Summary) -> StoreResult<()> {
        if self.fail_summary_insert {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.insert_summary(summary).await
    }
}
