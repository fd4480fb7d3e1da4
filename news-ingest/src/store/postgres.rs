use async_trait::async_trait;
use chrono::{DateTime, Utc};
use interfaces::{Article, ArticleStatus, ArticleStore, Source, StoreError, StoreResult, Summary};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn source_from_row(row: &PgRow) -> StoreResult<Source> {
    Ok(Source {
        id: row.try_get("id").map_err(backend)?,
        name: row.try_get("name").map_err(backend)?,
        rss_url: row.try_get("rss_url").map_err(backend)?,
        is_active: row.try_get("is_active").map_err(backend)?,
        categories: row.try_get("categories").map_err(backend)?,
        scrape_interval_minutes: non_negative(
            row.try_get("scrape_interval_minutes").map_err(backend)?,
        ),
        last_scrape: row.try_get("last_scrape").map_err(backend)?,
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

fn article_from_row(row: &PgRow) -> StoreResult<Article> {
    let status: String = row.try_get("status").map_err(backend)?;
    Ok(Article {
        id: row.try_get("id").map_err(backend)?,
        title: row.try_get("title").map_err(backend)?,
        url: row.try_get("url").map_err(backend)?,
        source_id: row.try_get("source_id").map_err(backend)?,
        source_name: row.try_get("source_name").map_err(backend)?,
        content: row.try_get("content").map_err(backend)?,
        excerpt: row.try_get("excerpt").map_err(backend)?,
        image_url: row.try_get("image_url").map_err(backend)?,
        author: row.try_get("author").map_err(backend)?,
        published_at: row.try_get("published_at").map_err(backend)?,
        status: status.parse().map_err(StoreError::Backend)?,
        categories: row.try_get("categories").map_err(backend)?,
        tags: row.try_get("tags").map_err(backend)?,
        read_time_minutes: non_negative(row.try_get("read_time_minutes").map_err(backend)?),
        created_at: row.try_get("created_at").map_err(backend)?,
    })
}

/// [`ArticleStore`] backed by PostgreSQL.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await.map_err(backend)?;
        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet.
    pub async fn setup_schema(&self) -> StoreResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                rss_url TEXT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                categories TEXT[] NOT NULL DEFAULT '{}',
                scrape_interval_minutes INTEGER NOT NULL DEFAULT 60,
                last_scrape TIMESTAMP WITH TIME ZONE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                source_id UUID NOT NULL,
                source_name TEXT NOT NULL,
                content TEXT,
                excerpt TEXT,
                image_url TEXT,
                author TEXT,
                published_at TIMESTAMP WITH TIME ZONE,
                status TEXT NOT NULL DEFAULT 'pending',
                categories TEXT[] NOT NULL DEFAULT '{}',
                tags TEXT[] NOT NULL DEFAULT '{}',
                read_time_minutes INTEGER NOT NULL DEFAULT 5,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_articles_status ON articles (status)",
            "CREATE INDEX IF NOT EXISTS idx_articles_categories ON articles USING GIN (categories)",
            r#"
            CREATE TABLE IF NOT EXISTS summaries (
                id UUID PRIMARY KEY,
                article_id UUID NOT NULL REFERENCES articles (id),
                executive_summary TEXT NOT NULL,
                key_points TEXT[] NOT NULL DEFAULT '{}',
                analysis TEXT NOT NULL DEFAULT '',
                takeaways TEXT[] NOT NULL DEFAULT '{}',
                read_time_minutes INTEGER NOT NULL DEFAULT 1,
                degraded BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_summaries_article ON summaries (article_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }

        info!("Database schema is ready");
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn list_active_sources(&self, category: Option<&str>) -> StoreResult<Vec<Source>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM sources
            WHERE is_active = TRUE AND ($1::TEXT IS NULL OR $1 = ANY(categories))
            ORDER BY created_at
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(source_from_row).collect()
    }

    async fn insert_source(&self, source: &Source) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sources (id, name, rss_url, is_active, categories, scrape_interval_minutes, last_scrape, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(source.id)
        .bind(&source.name)
        .bind(&source.rss_url)
        .bind(source.is_active)
        .bind(&source.categories)
        .bind(i32::try_from(source.scrape_interval_minutes).unwrap_or(i32::MAX))
        .bind(source.last_scrape)
        .bind(source.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        info!("Added source: {} with ID: {}", source.name, source.id);
        Ok(())
    }

    async fn count_sources(&self) -> StoreResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM sources")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let count: i64 = row.try_get("count").map_err(backend)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn find_article_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE url = $1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn find_article_by_id(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(article_from_row).transpose()
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (id, title, url, source_id, source_name, content, excerpt, image_url,
                                  author, published_at, status, categories, tags, read_time_minutes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.url)
        .bind(article.source_id)
        .bind(&article.source_name)
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(&article.image_url)
        .bind(&article.author)
        .bind(article.published_at)
        .bind(article.status.as_str())
        .bind(&article.categories)
        .bind(&article.tags)
        .bind(i32::try_from(article.read_time_minutes).unwrap_or(i32::MAX))
        .bind(article.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!("Stored article {} ({})", article.id, article.url);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate {
                url: article.url.clone(),
            }),
            Err(e) => Err(backend(e)),
        }
    }

    async fn update_article_status(&self, id: Uuid, status: ArticleStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE articles SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "article", id });
        }
        Ok(())
    }

    async fn update_source_last_scrape(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE sources SET last_scrape = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind: "source", id });
        }
        Ok(())
    }

    async fn insert_summary(&self, summary: &Summary) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO summaries (id, article_id, executive_summary, key_points, analysis,
                                   takeaways, read_time_minutes, degraded, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(summary.id)
        .bind(summary.article_id)
        .bind(&summary.executive_summary)
        .bind(&summary.key_points)
        .bind(&summary.analysis)
        .bind(&summary.takeaways)
        .bind(i32::try_from(summary.read_time_minutes).unwrap_or(i32::MAX))
        .bind(summary.degraded)
        .bind(summary.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        debug!("Stored summary {} for article {}", summary.id, summary.article_id);
        Ok(())
    }
}
