use crate::llm_adapter::{GenerationRequest, LlmAdapter};
use crate::types::{PipelineError, Result};
use crate::utils::text;
use chrono::Utc;
use interfaces::{ArticleStatus, ArticleStore, Summary};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert news summarizer. Generate concise, insightful summaries of news articles.";

/// Article content beyond this many characters is not sent to the model.
pub const MAX_PROMPT_CONTENT_CHARS: usize = 8_000;

const DEGRADED_SUMMARY_CHARS: usize = 300;
const DEGRADED_KEY_POINT: &str = "Summary generated";
const DEGRADED_ANALYSIS: &str = "Analysis pending";
const DEGRADED_TAKEAWAY: &str = "See full article for details";

/// The JSON object the model is asked to produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryPayload {
    pub executive_summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub takeaways: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSummary {
    pub payload: SummaryPayload,
    pub degraded: bool,
}

pub fn build_prompt(title: &str, content: &str) -> String {
    let content = text::truncate_chars(content, MAX_PROMPT_CONTENT_CHARS);
    format!(
        r#"Analyze and summarize this news article:

Title: {title}
Content: {content}

Respond with a structured summary in exactly this JSON format:
{{
    "executive_summary": "A 2-3 sentence overview of the article",
    "key_points": ["Point 1", "Point 2", "Point 3", "Point 4"],
    "analysis": "A brief analysis or context about why this matters",
    "takeaways": ["Takeaway 1", "Takeaway 2", "Takeaway 3"]
}}

Keep it concise and focused on the most important information."#
    )
}

/// Read the structured payload out of free-form model output.
///
/// The span from the first `{` to the last `}` is parsed as JSON. Anything
/// else (no braces, malformed JSON, wrong field types) yields a degraded
/// payload built from the raw text instead of an error.
pub fn parse_summary_response(raw: &str) -> ParsedSummary {
    let structured = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str::<SummaryPayload>(&raw[start..=end]).ok()
        }
        _ => None,
    };

    match structured {
        Some(payload) => ParsedSummary {
            payload,
            degraded: false,
        },
        None => ParsedSummary {
            payload: SummaryPayload {
                executive_summary: text::truncate_chars(raw, DEGRADED_SUMMARY_CHARS).to_string(),
                key_points: vec![DEGRADED_KEY_POINT.to_string()],
                analysis: Some(DEGRADED_ANALYSIS.to_string()),
                takeaways: vec![DEGRADED_TAKEAWAY.to_string()],
            },
            degraded: true,
        },
    }
}

fn summary_read_time(payload: &SummaryPayload) -> u32 {
    let mut all_text = payload.executive_summary.clone();
    for part in payload
        .key_points
        .iter()
        .chain(payload.analysis.iter())
        .chain(payload.takeaways.iter())
    {
        all_text.push(' ');
        all_text.push_str(part);
    }
    text::read_time_minutes(&all_text)
}

/// Releases the single-flight slot for an article when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Uuid>>,
    article_id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.article_id);
    }
}

/// Moves a pending article to `published` (with a stored [`Summary`]) or to
/// `failed`.
pub struct SummarizationWorker {
    store: Arc<dyn ArticleStore>,
    llm: Arc<dyn LlmAdapter>,
    in_flight: Mutex<HashSet<Uuid>>,
}

impl SummarizationWorker {
    pub fn new(store: Arc<dyn ArticleStore>, llm: Arc<dyn LlmAdapter>) -> Self {
        info!("Summarization worker using {}", llm.adapter_name());
        Self {
            store,
            llm,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, article_id: Uuid) -> Result<InFlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(article_id) {
            return Err(PipelineError::SummaryInProgress { id: article_id });
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            article_id,
        })
    }

    /// Summarize one article.
    ///
    /// Articles without content are left `pending` and reported as
    /// [`PipelineError::NoContent`]. A second call for an article that is
    /// already being summarized returns [`PipelineError::SummaryInProgress`]
    /// and does not touch its status.
    pub async fn summarize(&self, article_id: Uuid) -> Result<Summary> {
        let _guard = self.claim(article_id)?;

        let article = match self.store.find_article_by_id(article_id).await {
            Ok(Some(article)) => article,
            Ok(None) => return Err(PipelineError::ArticleNotFound { id: article_id }),
            Err(e) => return Err(self.mark_failed(article_id, e.into()).await),
        };

        if !article.has_content() {
            warn!("Article {} has no content; leaving it pending", article_id);
            return Err(PipelineError::NoContent { id: article_id });
        }
        let content = article.content.as_deref().unwrap_or_default();

        let request = GenerationRequest {
            session_id: format!("summarize-{}", article_id),
            system: SYSTEM_INSTRUCTION.to_string(),
            prompt: build_prompt(&article.title, content),
        };

        let raw = match self.llm.generate(&request).await {
            Ok(raw) => raw,
            Err(e) => return Err(self.mark_failed(article_id, e).await),
        };

        let parsed = parse_summary_response(&raw);
        if parsed.degraded {
            warn!(
                "Model output for article {} was not structured JSON; storing degraded summary",
                article_id
            );
        }

        let summary = Summary {
            id: Uuid::new_v4(),
            article_id,
            read_time_minutes: summary_read_time(&parsed.payload),
            executive_summary: parsed.payload.executive_summary,
            key_points: parsed.payload.key_points,
            analysis: parsed.payload.analysis.unwrap_or_default(),
            takeaways: parsed.payload.takeaways,
            degraded: parsed.degraded,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert_summary(&summary).await {
            return Err(self.mark_failed(article_id, e.into()).await);
        }
        if let Err(e) = self
            .store
            .update_article_status(article_id, ArticleStatus::Published)
            .await
        {
            return Err(self.mark_failed(article_id, e.into()).await);
        }

        info!("Published article {} (degraded summary: {})", article_id, summary.degraded);
        Ok(summary)
    }

    async fn mark_failed(&self, article_id: Uuid, cause: PipelineError) -> PipelineError {
        error!("Summarization failed for article {}: {}", article_id, cause);
        if let Err(e) = self
            .store
            .update_article_status(article_id, ArticleStatus::Failed)
            .await
        {
            error!("Could not mark article {} as failed: {}", article_id, e);
        }
        cause
    }
}
