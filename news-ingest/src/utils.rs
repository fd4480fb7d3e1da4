/// Text processing utilities
pub mod text {
    pub const WORDS_PER_MINUTE: usize = 200;

    /// Trim every line and drop the blank ones.
    pub fn normalize_lines(text: &str) -> String {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First `max_chars` characters of `text`, never splitting a code point.
    pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((byte_index, _)) => &text[..byte_index],
            None => text,
        }
    }

    /// `max_chars` characters followed by `...` when `text` is longer.
    pub fn excerpt(text: &str, max_chars: usize) -> String {
        let head = truncate_chars(text, max_chars);
        if head.len() < text.len() {
            format!("{}...", head)
        } else {
            head.to_string()
        }
    }

    /// Whole minutes at 200 words per minute, never less than one.
    pub fn read_time_minutes(text: &str) -> u32 {
        let words = text.split_whitespace().count();
        ((words / WORDS_PER_MINUTE) as u32).max(1)
    }
}

/// URL helpers
pub mod url {
    use ::url::Url;

    /// Resolve `candidate` against `page_url`.
    ///
    /// Handles protocol-relative (`//host/img.png`) and root-relative
    /// (`/img.png`) references; absolute URLs pass through unchanged.
    pub fn resolve_against(page_url: &str, candidate: &str) -> String {
        let candidate = candidate.trim();
        if Url::parse(candidate).is_ok() {
            return candidate.to_string();
        }
        match Url::parse(page_url).and_then(|base| base.join(candidate)) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => candidate.to_string(),
        }
    }

    /// Only absolute http(s) URLs with a host are fetchable.
    pub fn validate_http_url(raw: &str) -> Result<Url, String> {
        let parsed = Url::parse(raw.trim()).map_err(|e| format!("invalid feed URL '{}': {}", raw, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme '{}' in feed URL", parsed.scheme()));
        }
        if parsed.host_str().is_none() {
            return Err(format!("feed URL '{}' has no host", raw));
        }
        Ok(parsed)
    }
}
