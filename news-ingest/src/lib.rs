pub mod cli;
pub mod dedup;
pub mod extractor;
pub mod fetcher;
pub mod llm_adapter;
pub mod orchestrator;
pub mod parser;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod summarizer;
pub mod traits;
pub mod types;
pub mod utils;

pub use types::*;
pub use dedup::DedupGate;
pub use extractor::{ContentExtractor, HtmlExtractor};
pub use fetcher::Fetcher;
pub use llm_adapter::{AnthropicAdapter, GenerationRequest, LlmAdapter, LlmConfig, MockLlmAdapter, MockReply};
pub use orchestrator::IngestionOrchestrator;
pub use parser::FeedParser;
pub use pipeline::{QueueStats, SummaryQueue, SummaryScheduler};
pub use sources::RssFeedReader;
pub use store::{seed_default_sources, InMemoryStore, PgStore};
pub use summarizer::SummarizationWorker;
pub use traits::{FeedSource, PageExtractor};
