use crate::fetcher::Fetcher;
use crate::traits::PageExtractor;
use crate::types::{ExtractedContent, FetchOutcome, PipelineError, Result};
use crate::utils::{text, url};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::{debug, info};

/// Elements that never contribute body text.
const STRIPPED_TAGS: [&str; 5] = ["script", "style", "nav", "header", "footer"];

pub const MAX_CONTENT_CHARS: usize = 15_000;
pub const EXCERPT_CHARS: usize = 300;

/// Meta tags consulted for the lead image, highest priority first.
const IMAGE_META_SELECTORS: [&str; 3] = [
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"meta[property="article:image"]"#,
];

/// Body containers, highest priority first. The whole page is the fallback.
const TEXT_CONTAINER_SELECTORS: [&str; 3] = ["article", "main", r#"div[class*="content"]"#];

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| PipelineError::Parse(format!("invalid selector {}: {:?}", selector, e)))
}

/// The fixed, first-match-wins heuristics that turn an HTML page into
/// [`ExtractedContent`]. Pure; no network access.
pub struct HtmlExtractor {
    image_meta: Vec<Selector>,
    article_or_main: Selector,
    img: Selector,
    text_containers: Vec<Selector>,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            image_meta: IMAGE_META_SELECTORS
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?,
            article_or_main: parse_selector("article, main")?,
            img: parse_selector("img")?,
            text_containers: TEXT_CONTAINER_SELECTORS
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn extract(&self, html: &str, page_url: &str) -> ExtractedContent {
        let document = Html::parse_document(html);

        let image_url = self.select_image(&document, page_url);
        let full_text = text::normalize_lines(&self.select_text(&document));

        if full_text.is_empty() {
            return ExtractedContent {
                content: None,
                excerpt: None,
                image_url,
            };
        }

        let excerpt = text::excerpt(&full_text, EXCERPT_CHARS);
        let content = text::truncate_chars(&full_text, MAX_CONTENT_CHARS).to_string();

        ExtractedContent {
            content: Some(content),
            excerpt: Some(excerpt),
            image_url,
        }
    }

    /// og:image, then twitter:image, then article:image, then the first
    /// `<img>` of the first `<article>`/`<main>`.
    ///
    /// Only the first tag of each kind is consulted; if it has no usable value
    /// the next tier is tried.
    pub fn select_image(&self, document: &Html, page_url: &str) -> Option<String> {
        for selector in &self.image_meta {
            let candidate = document
                .select(selector)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .map(str::trim)
                .filter(|content| !content.is_empty());

            if let Some(content) = candidate {
                return Some(url::resolve_against(page_url, content));
            }
        }

        let container = document.select(&self.article_or_main).next()?;
        let src = container
            .select(&self.img)
            .next()?
            .value()
            .attr("src")
            .map(str::trim)
            .filter(|src| !src.is_empty())?;

        Some(url::resolve_against(page_url, src))
    }

    /// Raw text of the first matching container, or of the whole page when no
    /// container matches or the match holds no text.
    pub fn select_text(&self, document: &Html) -> String {
        let container = self.text_containers.iter().find_map(|selector| {
            document
                .select(selector)
                .find(|element| !is_inside_stripped(element))
        });

        if let Some(element) = container {
            let text = collect_text(element);
            if !text.is_empty() {
                return text;
            }
        }

        collect_text(document.root_element())
    }
}

fn is_stripped(name: &str) -> bool {
    STRIPPED_TAGS.contains(&name)
}

fn is_inside_stripped(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|ancestor| {
        ancestor
            .value()
            .as_element()
            .is_some_and(|el| is_stripped(el.name()))
    })
}

/// Text nodes under `element`, each trimmed, one per line, skipping
/// [`STRIPPED_TAGS`] subtrees.
fn collect_text(element: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();
    push_text(element, &mut pieces);
    pieces.join("\n")
}

fn push_text(element: ElementRef<'_>, pieces: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    pieces.push(trimmed.to_string());
                }
            }
            Node::Element(el) if is_stripped(el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    push_text(child_element, pieces);
                }
            }
            _ => {}
        }
    }
}

/// [`PageExtractor`] that downloads the page with the shared [`Fetcher`] and
/// runs [`HtmlExtractor`] over it.
pub struct ContentExtractor {
    fetcher: Fetcher,
    html: HtmlExtractor,
    timeout: Duration,
}

impl ContentExtractor {
    pub fn new(fetcher: Fetcher, timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher,
            html: HtmlExtractor::new()?,
            timeout,
        })
    }
}

#[async_trait]
impl PageExtractor for ContentExtractor {
    async fn extract(&self, article_url: &str) -> FetchOutcome<ExtractedContent> {
        let body = match self.fetcher.fetch_text(article_url, self.timeout).await {
            FetchOutcome::Ready(body) => body,
            FetchOutcome::Absent { reason } => {
                debug!("No page content for {}: {}", article_url, reason);
                return FetchOutcome::Absent { reason };
            }
        };

        let extracted = self.html.extract(&body, article_url);
        info!(
            "Extracted {} chars from {} (image: {})",
            extracted.content.as_deref().map_or(0, |c| c.chars().count()),
            article_url,
            extracted.image_url.is_some()
        );
        FetchOutcome::Ready(extracted)
    }
}
