use anyhow::{bail, Context};
use clap::Parser;
use interfaces::ArticleStore;
use news_ingest::cli::{Cli, Command};
use news_ingest::{
    seed_default_sources, AnthropicAdapter, ContentExtractor, Fetcher, IngestionOrchestrator,
    LlmConfig, PgStore, PipelineConfig, RssFeedReader, ScrapeRequest, SummarizationWorker,
    SummaryQueue,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

fn redact(database_url: &str) -> String {
    match url::Url::parse(database_url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => database_url.to_string(),
    }
}

fn llm_config(cli: &Cli) -> anyhow::Result<LlmConfig> {
    let Some(api_key) = cli.llm_api_key.clone() else {
        bail!("LLM_API_KEY (or --llm-api-key) is required for summarization");
    };
    let mut config = LlmConfig::new(api_key);
    if let Some(model) = &cli.llm_model {
        config.model = model.clone();
    }
    if let Some(base_url) = &cli.llm_base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

fn summarization_worker(
    cli: &Cli,
    fetcher: &Fetcher,
    store: Arc<dyn ArticleStore>,
) -> anyhow::Result<Arc<SummarizationWorker>> {
    let llm = AnthropicAdapter::new(fetcher.client().clone(), llm_config(cli)?)?;
    Ok(Arc::new(SummarizationWorker::new(store, Arc::new(llm))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = PipelineConfig::default();

    info!("Connecting to database: {}", redact(&cli.database_url));
    let pg = PgStore::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", redact(&cli.database_url)))?;

    match &cli.command {
        Command::InitDb { seed } => {
            pg.setup_schema().await.context("failed to create schema")?;
            if *seed {
                let inserted = seed_default_sources(&pg).await?;
                info!("Inserted {} sources", inserted);
            }
        }
        Command::Scrape {
            category,
            due_only,
        } => {
            let store: Arc<dyn ArticleStore> = Arc::new(pg);
            let fetcher = Fetcher::new(&config)?;
            let worker = summarization_worker(&cli, &fetcher, store.clone())?;
            let queue = SummaryQueue::start(worker, config.summary_concurrency);

            let feeds = RssFeedReader::new(
                fetcher.clone(),
                Duration::from_secs(config.feed_timeout_seconds),
            );
            let extractor = ContentExtractor::new(
                fetcher.clone(),
                Duration::from_secs(config.page_timeout_seconds),
            )?;
            let orchestrator = IngestionOrchestrator::new(
                store,
                Arc::new(feeds),
                Arc::new(extractor),
                config.clone(),
            )
            .with_scheduler(queue.scheduler());

            let request = ScrapeRequest {
                category: category.clone(),
                due_only: *due_only,
            };
            let outcome = orchestrator.scrape(&request).await;

            // Jobs already queued still run before exit.
            drop(orchestrator);
            let stats = queue.shutdown().await;

            let batch = outcome?;
            println!("{}", serde_json::to_string_pretty(&batch)?);
            info!(
                "Summaries: {} published, {} failed, {} skipped",
                stats.published, stats.failed, stats.skipped
            );
        }
        Command::Summarize { article_id } => {
            let store: Arc<dyn ArticleStore> = Arc::new(pg);
            let fetcher = Fetcher::new(&config)?;
            let worker = summarization_worker(&cli, &fetcher, store)?;

            match worker.summarize(*article_id).await {
                Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                Err(e) => {
                    error!("Could not generate summary for {}: {}", article_id, e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
