use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::{Article, ArticleStatus, ArticleStore, Source, StoreError, StoreResult, Summary};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    sources: Vec<Source>,
    articles: HashMap<Uuid, Article>,
    url_index: HashMap<String, Uuid>,
    summaries: Vec<Summary>,
}

/// Process-local [`ArticleStore`]. Used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_sources(sources: Vec<Source>) -> Self {
        let store = Self::new();
        store.tables.write().await.sources = sources;
        store
    }

    /// All articles, oldest first.
    pub async fn articles(&self) -> Vec<Article> {
        let tables = self.tables.read().await;
        let mut articles: Vec<Article> = tables.articles.values().cloned().collect();
        articles.sort_by_key(|a| a.created_at);
        articles
    }

    pub async fn summaries_for(&self, article_id: Uuid) -> Vec<Summary> {
        self.tables
            .read()
            .await
            .summaries
            .iter()
            .filter(|s| s.article_id == article_id)
            .cloned()
            .collect()
    }

    pub async fn source(&self, id: Uuid) -> Option<Source> {
        self.tables
            .read()
            .await
            .sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }
}

#[async_trait]
impl ArticleStore for InMemoryStore {
    async fn list_active_sources(&self, category: Option<&str>) -> StoreResult<Vec<Source>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sources
            .iter()
            .filter(|s| s.is_active)
            .filter(|s| category.map_or(true, |c| s.has_category(c)))
            .cloned()
            .collect())
    }

    async fn insert_source(&self, source: &Source) -> StoreResult<()> {
        self.tables.write().await.sources.push(source.clone());
        Ok(())
    }

    async fn count_sources(&self) -> StoreResult<usize> {
        Ok(self.tables.read().await.sources.len())
    }

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        let tables = self.tables.read().await;
        Ok(tables
            .url_index
            .get(url)
            .and_then(|id| tables.articles.get(id))
            .cloned())
    }

    async fn find_article_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
        Ok(self.tables.read().await.articles.get(&id).cloned())
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.url_index.contains_key(&article.url) {
            return Err(StoreError::Duplicate {
                url: article.url.clone(),
            });
        }
        tables.url_index.insert(article.url.clone(), article.id);
        tables.articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn update_article_status(&self, id: Uuid, status: ArticleStatus) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let article = tables
            .articles
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind: "article", id })?;
        article.status = status;
        Ok(())
    }

    async fn update_source_last_scrape(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let source = tables
            .sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(StoreError::NotFound { kind: "source", id })?;
        source.last_scrape = Some(at);
        Ok(())
    }

    async fn insert_summary(&self, summary: &Summary) -> StoreResult<()> {
        self.tables.write().await.summaries.push(summary.clone());
        Ok(())
    }
}
