//! Post persistence with idempotent upserts.
//!
//! A [`PostBundle`] is written as one transaction touching five tables:
//!
//! ```text
//! posts ──< post_tags >── tags
//!   │
//!   └────< post_authors >── authors
//! ```
//!
//! - Posts are keyed by `slug`; a repeated write overwrites every mutable
//!   field and refreshes `updated_at` but keeps the original `id`.
//! - Tags and authors are keyed by `name`. For authors, a `NULL` incoming
//!   `twitter` / `avatar_url` keeps whatever is stored.
//! - Join rows are inserted with `ON CONFLICT DO NOTHING`, so re-linking is a
//!   no-op.
//!
//! Any failure after the transaction opens rolls the whole bundle back.
//! Validation failures never open a connection at all.

use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::config::DbConfig;
use crate::db;
use crate::models::{
    estimate_reading_time, non_blank, AuthorInput, PostBundle, StoredAuthor, StoredPost,
};
use crate::slug::resolve_slug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("missing required post field '{0}'")]
    MissingField(&'static str),
    #[error("cannot derive a slug from title '{0}'")]
    EmptySlug(String),
    #[error("no database connection string configured")]
    NotConfigured,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Identity of a post after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPost {
    pub id: String,
    pub slug: String,
}

/// Row counts per table, for `postsmith stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub posts: i64,
    pub tags: i64,
    pub authors: i64,
    pub post_tags: i64,
    pub post_authors: i64,
    /// Most recent `updated_at` across posts.
    pub last_updated: Option<i64>,
}

/// Bundle fields after validation and normalization, ready for SQL.
struct PreparedPost<'a> {
    slug: String,
    title: &'a str,
    summary: Option<&'a str>,
    content_html: &'a str,
    date: Option<&'a str>,
    image: Option<&'a str>,
    reading_time_minutes: i64,
    tags: Vec<&'a str>,
    authors: Vec<PreparedAuthor<'a>>,
}

struct PreparedAuthor<'a> {
    name: &'a str,
    twitter: Option<&'a str>,
    avatar_url: Option<&'a str>,
}

impl<'a> PreparedPost<'a> {
    fn from_bundle(bundle: &'a PostBundle) -> Result<Self, StoreError> {
        let title = bundle
            .title()
            .ok_or(StoreError::MissingField("title"))?
            .trim();
        let content_html = bundle
            .content_html()
            .ok_or(StoreError::MissingField("contentHtml"))?;
        let slug = resolve_slug(bundle.post.slug.as_deref(), title)
            .ok_or_else(|| StoreError::EmptySlug(title.to_string()))?;

        let tags = bundle
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let authors = bundle
            .authors
            .iter()
            .filter_map(PreparedAuthor::from_input)
            .collect();

        Ok(Self {
            slug,
            title,
            summary: non_blank(bundle.post.summary.as_deref()),
            content_html,
            date: non_blank(bundle.post.date.as_deref()),
            image: non_blank(bundle.post.image.as_deref()),
            reading_time_minutes: bundle
                .post
                .reading_time_minutes
                .filter(|m| *m > 0)
                .unwrap_or_else(|| estimate_reading_time(content_html)),
            tags,
            authors,
        })
    }
}

impl<'a> PreparedAuthor<'a> {
    fn from_input(author: &'a AuthorInput) -> Option<Self> {
        let name = author.name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            twitter: non_blank(author.twitter.as_deref()),
            avatar_url: non_blank(author.avatar_url.as_deref()),
        })
    }
}

/// Handle to the post database. Opens one connection per operation.
#[derive(Debug, Clone)]
pub struct PostStore {
    url: Option<String>,
}

impl PostStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    pub fn from_config(config: &DbConfig) -> Self {
        Self {
            url: config.url.clone().filter(|u| !u.trim().is_empty()),
        }
    }

    /// Write a bundle, reporting only success or failure.
    ///
    /// The cause of a failure is logged, never returned.
    pub async fn write_post_bundle(&self, bundle: &PostBundle) -> bool {
        match self.upsert_bundle(bundle).await {
            Ok(_) => true,
            Err(StoreError::MissingField(field)) => {
                tracing::warn!(field, "skipping database write: missing required field");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "error writing post to database");
                false
            }
        }
    }

    /// Write a bundle and return the resolved post identity.
    pub async fn upsert_bundle(&self, bundle: &PostBundle) -> Result<WrittenPost, StoreError> {
        let prepared = PreparedPost::from_bundle(bundle)?;
        let pool = self.connect().await?;

        let result = write_in_transaction(&pool, &prepared).await;
        pool.close().await;

        let written = result?;
        tracing::info!(
            title = prepared.title,
            slug = %written.slug,
            tags = prepared.tags.len(),
            authors = prepared.authors.len(),
            "post written to database"
        );
        Ok(written)
    }

    /// Load a post with its tags and authors, both ordered by name.
    pub async fn get_post(&self, slug: &str) -> Result<Option<StoredPost>, StoreError> {
        let pool = self.connect().await?;
        let result = fetch_post(&pool, slug).await;
        pool.close().await;
        result.map_err(StoreError::from)
    }

    pub async fn count_rows(&self) -> Result<TableCounts, StoreError> {
        let pool = self.connect().await?;
        let result = fetch_counts(&pool).await;
        pool.close().await;
        result.map_err(StoreError::from)
    }

    /// Tag names with the number of posts using each, most used first.
    pub async fn tag_usage(&self, limit: i64) -> Result<Vec<(String, i64)>, StoreError> {
        let pool = self.connect().await?;
        let result = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT t.name, COUNT(pt.post_id) AS uses
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            GROUP BY t.id
            ORDER BY uses DESC, t.name ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&pool)
        .await;
        pool.close().await;
        result.map_err(StoreError::from)
    }

    async fn connect(&self) -> Result<SqlitePool, StoreError> {
        let url = self.url.as_deref().ok_or(StoreError::NotConfigured)?;
        Ok(db::connect(url).await?)
    }
}

async fn write_in_transaction(
    pool: &SqlitePool,
    post: &PreparedPost<'_>,
) -> Result<WrittenPost, StoreError> {
    let mut tx = pool.begin().await?;

    match write_bundle(&mut tx, post).await {
        Ok(written) => {
            tx.commit().await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(e.into())
        }
    }
}

async fn write_bundle(
    tx: &mut Transaction<'_, Sqlite>,
    post: &PreparedPost<'_>,
) -> Result<WrittenPost, sqlx::Error> {
    let now = chrono::Utc::now().timestamp();

    let post_id: String = sqlx::query_scalar(
        r#"
        INSERT INTO posts (id, slug, title, summary, content_html, date, image, reading_time_minutes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            title = excluded.title,
            summary = excluded.summary,
            content_html = excluded.content_html,
            date = excluded.date,
            image = excluded.image,
            reading_time_minutes = excluded.reading_time_minutes,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&post.slug)
    .bind(post.title)
    .bind(post.summary)
    .bind(post.content_html)
    .bind(post.date)
    .bind(post.image)
    .bind(post.reading_time_minutes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    for name in &post.tags {
        // The no-op update makes RETURNING yield the existing id on conflict.
        let tag_id: String = sqlx::query_scalar(
            r#"
            INSERT INTO tags (id, name) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET name = excluded.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(*name)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?) ON CONFLICT(post_id, tag_id) DO NOTHING",
        )
        .bind(&post_id)
        .bind(&tag_id)
        .execute(&mut **tx)
        .await?;
    }

    for author in &post.authors {
        let author_id: String = sqlx::query_scalar(
            r#"
            INSERT INTO authors (id, name, twitter, avatar_url) VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                twitter = COALESCE(excluded.twitter, authors.twitter),
                avatar_url = COALESCE(excluded.avatar_url, authors.avatar_url)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(author.name)
        .bind(author.twitter)
        .bind(author.avatar_url)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO post_authors (post_id, author_id) VALUES (?, ?) ON CONFLICT(post_id, author_id) DO NOTHING",
        )
        .bind(&post_id)
        .bind(&author_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(WrittenPost {
        id: post_id,
        slug: post.slug.clone(),
    })
}

async fn fetch_post(pool: &SqlitePool, slug: &str) -> Result<Option<StoredPost>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, slug, title, summary, content_html, date, image, reading_time_minutes, created_at, updated_at FROM posts WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let id: String = row.get("id");

    let tags: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT t.name FROM tags t
        JOIN post_tags pt ON pt.tag_id = t.id
        WHERE pt.post_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(&id)
    .fetch_all(pool)
    .await?;

    let authors = sqlx::query(
        r#"
        SELECT a.name, a.twitter, a.avatar_url FROM authors a
        JOIN post_authors pa ON pa.author_id = a.id
        WHERE pa.post_id = ?
        ORDER BY a.name
        "#,
    )
    .bind(&id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| StoredAuthor {
        name: r.get("name"),
        twitter: r.get("twitter"),
        avatar_url: r.get("avatar_url"),
    })
    .collect();

    Ok(Some(StoredPost {
        id,
        slug: row.get("slug"),
        title: row.get("title"),
        summary: row.get("summary"),
        content_html: row.get("content_html"),
        date: row.get("date"),
        image: row.get("image"),
        reading_time_minutes: row.get("reading_time_minutes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        tags,
        authors,
    }))
}

async fn fetch_counts(pool: &SqlitePool) -> Result<TableCounts, sqlx::Error> {
    let count = |table: &'static str| {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        async move { sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await }
    };

    Ok(TableCounts {
        posts: count("posts").await?,
        tags: count("tags").await?,
        authors: count("authors").await?,
        post_tags: count("post_tags").await?,
        post_authors: count("post_authors").await?,
        last_updated: sqlx::query_scalar("SELECT MAX(updated_at) FROM posts")
            .fetch_one(pool)
            .await?,
    })
}
