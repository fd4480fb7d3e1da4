pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use interfaces::{ArticleStore, Source, StoreResult};
use tracing::info;

/// Feeds a fresh installation starts with: name, feed URL, categories.
pub const DEFAULT_SOURCES: [(&str, &str, &[&str]); 5] = [
    (
        "TechCrunch",
        "https://techcrunch.com/feed/",
        &["AI", "Apple", "Tesla", "Crypto"],
    ),
    (
        "The Verge",
        "https://www.theverge.com/rss/index.xml",
        &["AI", "Apple", "Tesla", "Climate"],
    ),
    (
        "Wired",
        "https://www.wired.com/feed/rss",
        &["AI", "Crypto", "Climate"],
    ),
    (
        "Ars Technica",
        "https://feeds.arstechnica.com/arstechnica/index",
        &["AI", "Apple", "Tesla"],
    ),
    (
        "Reuters",
        "https://www.reutersagency.com/feed/?taxonomy=best-topics&post_type=best",
        &["Politics", "Finance", "Climate"],
    ),
];

/// Insert [`DEFAULT_SOURCES`] if the store has no sources at all.
///
/// Returns the number of sources inserted.
pub async fn seed_default_sources(store: &dyn ArticleStore) -> StoreResult<usize> {
    if store.count_sources().await? > 0 {
        info!("Sources already configured; skipping seed");
        return Ok(0);
    }

    for (name, rss_url, categories) in DEFAULT_SOURCES {
        let source = Source::new(
            name,
            rss_url,
            categories.iter().map(|c| c.to_string()).collect(),
        );
        store.insert_source(&source).await?;
    }

    info!("Seeded {} default news sources", DEFAULT_SOURCES.len());
    Ok(DEFAULT_SOURCES.len())
}
