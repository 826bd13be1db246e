use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;

use super::{with_timeout, PostsRepo, StoreError};
use crate::feed::FeedQuery;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Starts at 1 and grows by exactly one per successful update.
    pub version: i32,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// A feed row: the post plus its author's username and comment count.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostWithMetadata {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    pub comments_count: i64,
    pub username: String,
}

const POST_COLUMNS: &str = "id, user_id, title, content, tags, created_at, updated_at, version";

pub struct PgPosts {
    db: PgPool,
    timeout: Duration,
}

impl PgPosts {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl PostsRepo for PgPosts {
    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, Post>(&format!(
                r#"
                INSERT INTO posts (user_id, title, content, tags)
                VALUES ($1, $2, $3, $4)
                RETURNING {POST_COLUMNS}
                "#
            ))
            .bind(post.user_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.tags)
            .fetch_one(&self.db)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, StoreError> {
        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, Post>(&format!(
                "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
            ))
            .bind(id)
            .fetch_one(&self.db)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await
    }

    async fn update(&self, post: &Post) -> Result<Post, StoreError> {
        with_timeout(self.timeout, async {
            // Zero matched rows means either a stale version or a deleted post;
            // both surface as a conflict.
            let row = sqlx::query_as::<_, Post>(&format!(
                r#"
                UPDATE posts
                SET title = $1, content = $2, tags = $3,
                    updated_at = now(), version = version + 1
                WHERE id = $4 AND version = $5
                RETURNING {POST_COLUMNS}
                "#
            ))
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.tags)
            .bind(post.id)
            .bind(post.version)
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::VersionConflict)?;
            debug!(post_id = row.id, version = row.version, "post updated");
            Ok::<_, StoreError>(row)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn user_feed(
        &self,
        viewer_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, StoreError> {
        // The sort direction is a validated enum, never caller text.
        let sql = format!(
            r#"
            SELECT p.id, p.user_id, p.title, p.content, p.tags, p.created_at,
                   p.updated_at, p.version,
                   COUNT(c.id) AS comments_count,
                   u.username
            FROM posts p
            JOIN users u ON u.id = p.user_id
            LEFT JOIN comments c ON c.post_id = p.id
            WHERE (p.user_id = $1
                   OR p.user_id IN (SELECT user_id FROM followers WHERE follower_id = $1))
              AND (p.title ILIKE '%' || $4 || '%' OR p.content ILIKE '%' || $4 || '%')
              AND (cardinality($5::text[]) = 0 OR p.tags && $5::text[])
              AND ($6::timestamptz IS NULL OR p.created_at >= $6)
              AND ($7::timestamptz IS NULL OR p.created_at <= $7)
            GROUP BY p.id, u.username
            ORDER BY p.created_at {dir}, p.id {dir}
            LIMIT $2 OFFSET $3
            "#,
            dir = query.sort.as_sql(),
        );

        with_timeout(self.timeout, async {
            let rows = sqlx::query_as::<_, PostWithMetadata>(&sql)
                .bind(viewer_id)
                .bind(query.limit)
                .bind(query.offset)
                .bind(&query.search)
                .bind(&query.tags)
                .bind(query.since)
                .bind(query.until)
                .fetch_all(&self.db)
                .await?;
            Ok::<_, StoreError>(rows)
        })
        .await
    }
}
