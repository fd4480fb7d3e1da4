use crate::dedup::DedupGate;
use crate::pipeline::SummaryScheduler;
use crate::traits::{FeedSource, PageExtractor};
use crate::types::{
    ExtractedContent, FeedItem, FetchOutcome, PipelineConfig, PipelineError, Result,
    ScrapeBatch, ScrapeRequest, ScrapeResult, ScrapeStatus,
};
use crate::utils::{text, url};
use chrono::Utc;
use interfaces::{Article, ArticleStatus, ArticleStore, Source, StoreError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Read time assigned to articles whose page yielded no text.
pub const DEFAULT_READ_TIME_MINUTES: u32 = 5;
pub const UNTITLED: &str = "Untitled";

/// What happened to a single feed entry during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Added(Uuid),
    Skipped,
}

/// Drives scrape runs: feed entries in, pending articles out.
pub struct IngestionOrchestrator {
    store: Arc<dyn ArticleStore>,
    feeds: Arc<dyn FeedSource>,
    extractor: Arc<dyn PageExtractor>,
    dedup: DedupGate,
    config: PipelineConfig,
    scheduler: Option<SummaryScheduler>,
}

impl IngestionOrchestrator {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        feeds: Arc<dyn FeedSource>,
        extractor: Arc<dyn PageExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            dedup: DedupGate::new(store.clone()),
            store,
            feeds,
            extractor,
            config,
            scheduler: None,
        }
    }

    /// Hand newly added articles to the summary queue after each source run.
    pub fn with_scheduler(mut self, scheduler: SummaryScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Scrape the active sources matching `request`, one after another.
    ///
    /// At most `max_sources_per_request` sources are run; `total_sources`
    /// reports how many matched.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeBatch> {
        let mut sources = self
            .store
            .list_active_sources(request.category.as_deref())
            .await?;

        if request.due_only {
            let now = Utc::now();
            sources.retain(|source| source.is_due(now));
        }

        if sources.is_empty() {
            return Err(PipelineError::NoActiveSources);
        }

        let total_sources = sources.len();
        if total_sources > self.config.max_sources_per_request {
            info!(
                "{} sources matched; running the first {}",
                total_sources, self.config.max_sources_per_request
            );
        }

        let mut results = Vec::new();
        for source in sources.iter().take(self.config.max_sources_per_request) {
            let result = self.scrape_source(source).await;
            self.schedule_summaries(&result);
            results.push(result);
        }

        Ok(ScrapeBatch {
            results,
            total_sources,
        })
    }

    fn schedule_summaries(&self, result: &ScrapeResult) {
        let Some(scheduler) = &self.scheduler else {
            return;
        };
        for article_id in &result.added_article_ids {
            if let Err(e) = scheduler.schedule(*article_id) {
                warn!("Could not schedule summary for {}: {}", article_id, e);
            }
        }
    }

    /// One scrape run against one source. Never fails; problems are reported
    /// through the result's status.
    pub async fn scrape_source(&self, source: &Source) -> ScrapeResult {
        info!("Scraping source {} ({})", source.name, source.rss_url);

        if let Err(cause) = url::validate_http_url(&source.rss_url) {
            error!("Source {} has an unusable feed URL: {}", source.name, cause);
            return ScrapeResult::new(source.id, &source.name, ScrapeStatus::Error(cause));
        }

        let entries = match self.feeds.fetch_entries(&source.rss_url).await {
            FetchOutcome::Ready(entries) if !entries.is_empty() => entries,
            FetchOutcome::Ready(_) => {
                info!("Feed for {} has no entries", source.name);
                return ScrapeResult::new(source.id, &source.name, ScrapeStatus::NoEntries);
            }
            FetchOutcome::Absent { reason } => {
                info!("No feed data for {}: {}", source.name, reason);
                return ScrapeResult::new(source.id, &source.name, ScrapeStatus::NoEntries);
            }
        };

        let mut result = ScrapeResult::new(source.id, &source.name, ScrapeStatus::Success);
        result.articles_found = entries.len();

        for entry in entries.iter().take(self.config.max_entries_per_run) {
            match self.ingest_entry(source, entry).await {
                Ok(EntryOutcome::Added(article_id)) => {
                    result.articles_added += 1;
                    result.added_article_ids.push(article_id);
                }
                Ok(EntryOutcome::Skipped) => {}
                Err(e) => {
                    error!(
                        "Error processing entry {:?} from {}: {}",
                        entry.link, source.name, e
                    );
                }
            }
        }

        if let Err(e) = self
            .store
            .update_source_last_scrape(source.id, Utc::now())
            .await
        {
            error!("Failed to record last scrape for {}: {}", source.name, e);
        }

        info!(
            "Source {}: {} found, {} added",
            source.name, result.articles_found, result.articles_added
        );
        result
    }

    async fn ingest_entry(&self, source: &Source, entry: &FeedItem) -> Result<EntryOutcome> {
        let Some(link) = entry.link.as_deref() else {
            debug!("Skipping entry without link from {}", source.name);
            return Ok(EntryOutcome::Skipped);
        };

        if !self.dedup.is_new(link).await? {
            return Ok(EntryOutcome::Skipped);
        }

        let extracted = match self.extractor.extract(link).await {
            FetchOutcome::Ready(extracted) => extracted,
            FetchOutcome::Absent { reason } => {
                debug!("Storing {} without page content: {}", link, reason);
                ExtractedContent::default()
            }
        };

        let article = build_article(source, entry, link, extracted);

        match self.store.insert_article(&article).await {
            Ok(()) => {
                debug!("Added article {} ({})", article.id, article.url);
                Ok(EntryOutcome::Added(article.id))
            }
            Err(StoreError::Duplicate { url }) => {
                debug!("Article {} was inserted concurrently; skipping", url);
                Ok(EntryOutcome::Skipped)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Assemble a pending article from a feed entry and whatever the page gave up.
pub fn build_article(
    source: &Source,
    entry: &FeedItem,
    link: &str,
    extracted: ExtractedContent,
) -> Article {
    let read_time_minutes = extracted
        .content
        .as_deref()
        .map_or(DEFAULT_READ_TIME_MINUTES, text::read_time_minutes);

    // Media the feed supplies beats anything found on the page.
    let image_url = entry
        .primary_media_url()
        .map(str::to_string)
        .or(extracted.image_url);

    Article {
        id: Uuid::new_v4(),
        title: entry
            .title
            .clone()
            .unwrap_or_else(|| UNTITLED.to_string()),
        url: link.to_string(),
        source_id: source.id,
        source_name: source.name.clone(),
        content: extracted.content,
        excerpt: extracted.excerpt,
        image_url,
        author: entry.author.clone(),
        published_at: entry.published_at,
        status: ArticleStatus::Pending,
        categories: source.categories.clone(),
        tags: Vec::new(),
        read_time_minutes,
        created_at: Utc::now(),
    }
}
