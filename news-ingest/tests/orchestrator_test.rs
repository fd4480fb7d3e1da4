mod common;

use chrono::{Duration, Utc};
use common::{feed_item, source, FlakyStore, StaticFeeds, StaticPages};
use interfaces::{ArticleStatus, ArticleStore};
use news_ingest::orchestrator::DEFAULT_READ_TIME_MINUTES;
use news_ingest::{
    ExtractedContent, IngestionOrchestrator, InMemoryStore, MediaRef, PipelineConfig,
    PipelineError, Result, ScrapeRequest, ScrapeStatus,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

const FEED_URL: &str = "https://feeds.example.com/tech.xml";

fn orchestrator(
    store: Arc<dyn ArticleStore>,
    feeds: Arc<StaticFeeds>,
    pages: Arc<StaticPages>,
) -> IngestionOrchestrator {
    IngestionOrchestrator::new(store, feeds, pages, PipelineConfig::default())
}

#[tokio::test]
async fn test_existing_url_is_skipped_before_extraction() -> Result<()> {
    common::init_tracing();

    let tech = source("Example Tech", FEED_URL, &["AI", "Apple"]);
    let store = Arc::new(InMemoryStore::with_sources(vec![tech.clone()]).await);
    store
        .insert_article(&common::pending_article("https://tech.example.com/b", Some("old")))
        .await?;

    let feeds = Arc::new(StaticFeeds::new().with_feed(
        FEED_URL,
        vec![
            feed_item("https://tech.example.com/a", "A"),
            feed_item("https://tech.example.com/b", "B"),
            feed_item("https://tech.example.com/c", "C"),
        ],
    ));
    let pages = Arc::new(StaticPages::new());
    let orchestrator = orchestrator(store.clone(), feeds, pages.clone());

    let before = Utc::now();
    let result = orchestrator.scrape_source(&tech).await;
    info!("Scrape result: {:?}", result);

    assert_eq!(result.articles_found, 3);
    assert_eq!(result.articles_added, 2);
    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(result.added_article_ids.len(), 2);

    assert_eq!(
        pages.requested(),
        vec!["https://tech.example.com/a", "https://tech.example.com/c"]
    );

    let last_scrape = store.source(tech.id).await.unwrap().last_scrape.unwrap();
    assert!(last_scrape >= before);

    for id in &result.added_article_ids {
        let article = store.find_article_by_id(*id).await?.unwrap();
        assert_eq!(article.status, ArticleStatus::Pending);
        assert_eq!(article.categories, vec!["AI", "Apple"]);
        assert_eq!(article.source_id, tech.id);
        assert_eq!(article.source_name, "Example Tech");
    }
    Ok(())
}

#[tokio::test]
async fn test_second_run_adds_nothing() -> Result<()> {
    common::init_tracing();

    let tech = source("Example Tech", FEED_URL, &[]);
    let store = Arc::new(InMemoryStore::with_sources(vec![tech.clone()]).await);
    let feeds = Arc::new(StaticFeeds::new().with_feed(
        FEED_URL,
        vec![
            feed_item("https://tech.example.com/a", "A"),
            feed_item("https://tech.example.com/b", "B"),
        ],
    ));
    let orchestrator = orchestrator(store.clone(), feeds, Arc::new(StaticPages::new()));

    let first = orchestrator.scrape_source(&tech).await;
    let first_scrape = store.source(tech.id).await.unwrap().last_scrape.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let before_second = Utc::now();
    let second = orchestrator.scrape_source(&tech).await;

    // A run that finds only known entries still counts as a scrape.
    let second_scrape = store.source(tech.id).await.unwrap().last_scrape.unwrap();
    assert!(second_scrape >= before_second);
    assert!(second_scrape > first_scrape);

    assert_eq!(first.articles_added, 2);
    assert_eq!(second.articles_found, 2);
    assert_eq!(second.articles_added, 0);
    assert_eq!(second.status, ScrapeStatus::Success);

    let articles = store.articles().await;
    assert_eq!(articles.len(), 2);
    assert_ne!(articles[0].url, articles[1].url);
    Ok(())
}

#[tokio::test]
async fn test_only_first_ten_entries_are_considered() {
    common::init_tracing();

    let tech = source("Busy Feed", FEED_URL, &[]);
    let store = Arc::new(InMemoryStore::with_sources(vec![tech.clone()]).await);
    let entries = (0..15)
        .map(|i| feed_item(&format!("https://busy.example.com/{}", i), "Busy"))
        .collect();
    let feeds = Arc::new(StaticFeeds::new().with_feed(FEED_URL, entries));
    let pages = Arc::new(StaticPages::new());
    let orchestrator = orchestrator(store.clone(), feeds, pages.clone());

    let result = orchestrator.scrape_source(&tech).await;

    assert_eq!(result.articles_found, 15);
    assert_eq!(result.articles_added, 10);
    assert_eq!(pages.requested().len(), 10);
    assert_eq!(
        pages.requested().last().map(String::as_str),
        Some("https://busy.example.com/9")
    );
}

#[tokio::test]
async fn test_empty_or_missing_feed_is_no_entries() {
    common::init_tracing();

    let empty = source("Empty", FEED_URL, &[]);
    let missing = source("Missing", "https://feeds.example.com/gone.xml", &[]);
    let store = Arc::new(InMemoryStore::with_sources(vec![empty.clone(), missing.clone()]).await);
    let feeds = Arc::new(StaticFeeds::new().with_feed(FEED_URL, Vec::new()));
    let orchestrator = orchestrator(store.clone(), feeds, Arc::new(StaticPages::new()));

    for src in [&empty, &missing] {
        let result = orchestrator.scrape_source(src).await;
        assert_eq!(result.status, ScrapeStatus::NoEntries);
        assert_eq!(result.status.to_string(), "no_entries");
        assert_eq!(result.articles_found, 0);
        assert_eq!(result.articles_added, 0);
        assert_eq!(store.source(src.id).await.unwrap().last_scrape, None);
    }
    assert!(store.articles().await.is_empty());
}

#[tokio::test]
async fn test_invalid_feed_url_is_reported_in_status() {
    common::init_tracing();

    let broken = source("Broken", "ftp://feeds.example.com/tech.xml", &[]);
    let store = Arc::new(InMemoryStore::with_sources(vec![broken.clone()]).await);
    let feeds = Arc::new(StaticFeeds::new());
    let orchestrator = orchestrator(store, feeds.clone(), Arc::new(StaticPages::new()));

    let result = orchestrator.scrape_source(&broken).await;

    assert!(matches!(result.status, ScrapeStatus::Error(_)));
    assert!(result.status.to_string().starts_with("error: "));
    assert_eq!(result.articles_found, 0);
    assert_eq!(result.articles_added, 0);
    assert_eq!(feeds.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_article_fields_from_feed_and_page() -> Result<()> {
    common::init_tracing();

    let tech = source("Example Tech", FEED_URL, &["Climate"]);
    let store = Arc::new(InMemoryStore::with_sources(vec![tech.clone()]).await);

    let mut with_media = feed_item("https://tech.example.com/media", "With media");
    with_media.author = Some("Reporter".to_string());
    with_media.media.push(MediaRef {
        url: "https://cdn.example.com/feed.jpg".to_string(),
        content_type: Some("image/jpeg".to_string()),
    });
    let page_image = feed_item("https://tech.example.com/page-image", "Page image");
    let mut untitled = feed_item("https://tech.example.com/untitled", "");
    untitled.title = None;

    let feeds = Arc::new(
        StaticFeeds::new().with_feed(FEED_URL, vec![with_media, page_image, untitled]),
    );
    let page = ExtractedContent {
        content: Some("word ".repeat(450).trim().to_string()),
        excerpt: Some("word word".to_string()),
        image_url: Some("https://cdn.example.com/page.jpg".to_string()),
    };
    let pages = Arc::new(
        StaticPages::new()
            .with_page("https://tech.example.com/media", page.clone())
            .with_page("https://tech.example.com/page-image", page)
            .with_absent("https://tech.example.com/untitled"),
    );
    let orchestrator = orchestrator(store.clone(), feeds, pages);

    let result = orchestrator.scrape_source(&tech).await;
    assert_eq!(result.articles_added, 3);

    let media = store
        .find_article_by_url("https://tech.example.com/media")
        .await?
        .unwrap();
    assert_eq!(media.image_url.as_deref(), Some("https://cdn.example.com/feed.jpg"));
    assert_eq!(media.author.as_deref(), Some("Reporter"));
    assert_eq!(media.read_time_minutes, 2);

    let from_page = store
        .find_article_by_url("https://tech.example.com/page-image")
        .await?
        .unwrap();
    assert_eq!(from_page.image_url.as_deref(), Some("https://cdn.example.com/page.jpg"));
    assert_eq!(from_page.author, None);

    let bare = store
        .find_article_by_url("https://tech.example.com/untitled")
        .await?
        .unwrap();
    assert_eq!(bare.title, "Untitled");
    assert_eq!(bare.content, None);
    assert_eq!(bare.image_url, None);
    assert_eq!(bare.read_time_minutes, DEFAULT_READ_TIME_MINUTES);
    assert_eq!(bare.categories, vec!["Climate"]);
    Ok(())
}

#[tokio::test]
async fn test_entry_failures_do_not_abort_the_run() {
    common::init_tracing();

    let tech = source("Example Tech", FEED_URL, &[]);
    let inner = Arc::new(InMemoryStore::with_sources(vec![tech.clone()]).await);
    let mut flaky = FlakyStore::new(inner.clone());
    flaky.fail_article_urls = vec!["https://tech.example.com/b".to_string()];
    flaky.fail_last_scrape = true;

    let mut no_link = feed_item("https://tech.example.com/ignored", "No link");
    no_link.link = None;
    let feeds = Arc::new(StaticFeeds::new().with_feed(
        FEED_URL,
        vec![
            feed_item("https://tech.example.com/a", "A"),
            no_link,
            feed_item("https://tech.example.com/b", "B"),
            feed_item("https://tech.example.com/c", "C"),
        ],
    ));
    let orchestrator = orchestrator(Arc::new(flaky), feeds, Arc::new(StaticPages::new()));

    let result = orchestrator.scrape_source(&tech).await;

    assert_eq!(result.articles_found, 4);
    assert_eq!(result.articles_added, 2);
    assert_eq!(result.status, ScrapeStatus::Success);
    assert_eq!(inner.articles().await.len(), 2);
}

#[tokio::test]
async fn test_scrape_caps_sources_per_request() -> Result<()> {
    common::init_tracing();

    let sources: Vec<_> = (0..7)
        .map(|i| source(&format!("Source {}", i), FEED_URL, &["AI"]))
        .collect();
    let store = Arc::new(InMemoryStore::with_sources(sources).await);
    let feeds = Arc::new(StaticFeeds::new().with_feed(
        FEED_URL,
        vec![feed_item("https://tech.example.com/shared", "Shared")],
    ));
    let orchestrator = orchestrator(store.clone(), feeds.clone(), Arc::new(StaticPages::new()));

    let batch = orchestrator.scrape(&ScrapeRequest::default()).await?;

    assert_eq!(batch.total_sources, 7);
    assert_eq!(batch.results.len(), 5);
    assert_eq!(feeds.calls.load(Ordering::SeqCst), 5);

    let added: usize = batch.results.iter().map(|r| r.articles_added).sum();
    assert_eq!(added, 1);
    Ok(())
}

#[tokio::test]
async fn test_scrape_filters_by_category_and_due_time() -> Result<()> {
    common::init_tracing();

    let ai = source("AI Source", FEED_URL, &["AI"]);
    let politics = source("Politics Source", FEED_URL, &["Politics"]);
    let mut fresh = source("Fresh AI", FEED_URL, &["AI"]);
    fresh.last_scrape = Some(Utc::now() - Duration::minutes(5));
    let mut paused = source("Paused AI", FEED_URL, &["AI"]);
    paused.is_active = false;

    let store = Arc::new(
        InMemoryStore::with_sources(vec![ai.clone(), politics, fresh, paused]).await,
    );
    let feeds = Arc::new(StaticFeeds::new().with_feed(FEED_URL, Vec::new()));
    let orchestrator = orchestrator(store, feeds, Arc::new(StaticPages::new()));

    let by_category = orchestrator
        .scrape(&ScrapeRequest {
            category: Some("AI".to_string()),
            due_only: false,
        })
        .await?;
    assert_eq!(by_category.total_sources, 2);

    let due = orchestrator
        .scrape(&ScrapeRequest {
            category: Some("AI".to_string()),
            due_only: true,
        })
        .await?;
    assert_eq!(due.total_sources, 1);
    assert_eq!(due.results[0].source_id, ai.id);

    let none = orchestrator
        .scrape(&ScrapeRequest {
            category: Some("Sports".to_string()),
            due_only: false,
        })
        .await;
    assert!(matches!(none, Err(PipelineError::NoActiveSources)));
    Ok(())
}

#[tokio::test]
async fn test_batch_serializes_status_strings() -> Result<()> {
    common::init_tracing();

    let tech = source("Example Tech", FEED_URL, &[]);
    let store = Arc::new(InMemoryStore::with_sources(vec![tech]).await);
    let feeds = Arc::new(StaticFeeds::new().with_feed(FEED_URL, Vec::new()));
    let orchestrator = orchestrator(store, feeds, Arc::new(StaticPages::new()));

    let batch = orchestrator.scrape(&ScrapeRequest::default()).await?;
    let json = serde_json::to_value(&batch)?;

    assert_eq!(json["total_sources"], 1);
    assert_eq!(json["results"][0]["status"], "no_entries");
    assert_eq!(json["results"][0]["source_name"], "Example Tech");
    Ok(())
}
