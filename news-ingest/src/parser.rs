use crate::types::{FeedItem, MediaRef, ParsedFeed, PipelineError, Result};
use feed_rs::parser;
use tracing::{debug, info, warn};

pub struct FeedParser;

/// Root vocabulary of a syndication document, as far as repair needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

impl FeedKind {
    fn detect(content: &str) -> Option<Self> {
        if content.contains("<rss") {
            Some(FeedKind::Rss)
        } else if content.contains("<rdf:RDF") {
            Some(FeedKind::Rdf)
        } else if content.contains("<feed") {
            Some(FeedKind::Atom)
        } else if content.contains("<channel") {
            Some(FeedKind::Rss)
        } else {
            None
        }
    }

    fn entry_tag(self) -> &'static str {
        match self {
            FeedKind::Atom => "entry",
            FeedKind::Rss | FeedKind::Rdf => "item",
        }
    }

    /// Tags that close the envelope after the last entry.
    fn envelope_close(self) -> &'static str {
        match self {
            FeedKind::Rss => "</channel></rss>",
            FeedKind::Rdf => "</rdf:RDF>",
            FeedKind::Atom => "</feed>",
        }
    }
}

impl FeedParser {
    /// Parse an RSS, RDF or Atom document.
    ///
    /// A document that fails to parse is first cut back to its last complete
    /// entry. If that still fails, every entry is parsed on its own inside the
    /// document's header and the readable ones are kept, so damage costs only
    /// the damaged entries.
    pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let parsed = match parser::parse(content.as_bytes()) {
            Ok(feed) => ParsedFeed {
                title: feed.title.map(|t| t.content),
                entries: feed.entries.into_iter().map(Self::parse_entry).collect(),
                recovered: false,
            },
            Err(first_error) => {
                warn!("Feed did not parse, attempting repair: {}", first_error);
                Self::recover(content).ok_or_else(|| {
                    PipelineError::Parse(format!("Failed to parse feed: {}", first_error))
                })?
            }
        };

        info!("Parsed feed with {} entries", parsed.entries.len());
        Ok(parsed)
    }

    fn recover(content: &str) -> Option<ParsedFeed> {
        let kind = FeedKind::detect(content)?;

        if let Some(repaired) = Self::truncate_to_last_entry(content, kind) {
            if let Ok(feed) = parser::parse(repaired.as_bytes()) {
                warn!("Feed parsed only after dropping a damaged tail");
                return Some(ParsedFeed {
                    title: feed.title.map(|t| t.content),
                    entries: feed.entries.into_iter().map(Self::parse_entry).collect(),
                    recovered: true,
                });
            }
        }

        Self::salvage_entries(content, kind)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> FeedItem {
        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.trim().to_string())
            .filter(|href| !href.is_empty());

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty());

        let author = entry
            .authors
            .first()
            .map(|a| a.name.trim().to_string())
            .filter(|name| !name.is_empty());

        let mut media = Vec::new();
        for object in &entry.media {
            for content in &object.content {
                if let Some(url) = &content.url {
                    media.push(MediaRef {
                        url: url.to_string(),
                        content_type: content.content_type.as_ref().map(|m| m.to_string()),
                    });
                }
            }
            for thumbnail in &object.thumbnails {
                if !thumbnail.image.uri.is_empty() {
                    media.push(MediaRef {
                        url: thumbnail.image.uri.clone(),
                        content_type: None,
                    });
                }
            }
        }

        FeedItem {
            link,
            title,
            author,
            published_at: entry.published,
            media,
        }
    }

    /// Cut `content` after its last closed entry and close the surrounding
    /// envelope.
    fn truncate_to_last_entry(content: &str, kind: FeedKind) -> Option<String> {
        let close = format!("</{}>", kind.entry_tag());
        let pos = content.rfind(&close)?;
        let mut repaired = content[..pos + close.len()].to_string();
        repaired.push_str(kind.envelope_close());
        Some(repaired)
    }

    /// Byte ranges of every `<item>...</item>` (or `<entry>...</entry>`) block.
    fn entry_ranges(content: &str, tag: &str) -> Vec<(usize, usize)> {
        let open = format!("<{}", tag);
        let close = format!("</{}>", tag);
        let mut ranges = Vec::new();
        let mut cursor = 0;

        while let Some(offset) = content[cursor..].find(&open) {
            let start = cursor + offset;
            let after_name = start + open.len();
            // `<items>` or `<entry-id>` are other elements.
            let is_entry = content[after_name..]
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c.is_whitespace());
            if !is_entry {
                cursor = after_name;
                continue;
            }
            let Some(close_offset) = content[after_name..].find(&close) else {
                break;
            };
            let end = after_name + close_offset + close.len();
            ranges.push((start, end));
            cursor = end;
        }

        ranges
    }

    /// Parse each entry block wrapped in the document's own header, keeping
    /// the ones that parse.
    fn salvage_entries(content: &str, kind: FeedKind) -> Option<ParsedFeed> {
        let ranges = Self::entry_ranges(content, kind.entry_tag());
        let header = &content[..ranges.first()?.0];

        let mut title = None;
        let mut entries = Vec::new();
        for (start, end) in &ranges {
            let document = format!("{}{}{}", header, &content[*start..*end], kind.envelope_close());
            match parser::parse(document.as_bytes()) {
                Ok(feed) => {
                    if title.is_none() {
                        title = feed.title.map(|t| t.content);
                    }
                    entries.extend(feed.entries.into_iter().map(Self::parse_entry));
                }
                Err(e) => debug!("Dropping unreadable entry at byte {}: {}", start, e),
            }
        }

        if entries.is_empty() {
            return None;
        }

        warn!(
            "Salvaged {} of {} entries from a damaged feed",
            entries.len(),
            ranges.len()
        );
        Some(ParsedFeed {
            title,
            entries,
            recovered: true,
        })
    }

    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel")
    }
}
