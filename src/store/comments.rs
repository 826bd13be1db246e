use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::{with_timeout, CommentsRepo, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Author's username, joined in on read.
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
}

const SELECT_COMMENT: &str = r#"
    SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, u.username
    FROM comments c
    JOIN users u ON c.user_id = u.id
"#;

pub struct PgComments {
    db: PgPool,
    timeout: Duration,
}

impl PgComments {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl CommentsRepo for PgComments {
    async fn create(&self, comment: NewComment) -> Result<Comment, StoreError> {
        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, Comment>(
                r#"
                WITH inserted AS (
                    INSERT INTO comments (post_id, user_id, content)
                    VALUES ($1, $2, $3)
                    RETURNING id, post_id, user_id, content, created_at
                )
                SELECT i.id, i.post_id, i.user_id, i.content, i.created_at, u.username
                FROM inserted i
                JOIN users u ON u.id = i.user_id
                "#,
            )
            .bind(comment.post_id)
            .bind(comment.user_id)
            .bind(&comment.content)
            .fetch_one(&self.db)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Comment, StoreError> {
        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = $1"))
                .bind(id)
                .fetch_one(&self.db)
                .await?;
            Ok::<_, StoreError>(row)
        })
        .await
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        with_timeout(self.timeout, async {
            let rows = sqlx::query_as::<_, Comment>(&format!(
                "{SELECT_COMMENT} WHERE c.post_id = $1 ORDER BY c.created_at DESC"
            ))
            .bind(post_id)
            .fetch_all(&self.db)
            .await?;
            Ok::<_, StoreError>(rows)
        })
        .await
    }

    async fn update(&self, comment: &Comment) -> Result<Comment, StoreError> {
        with_timeout(self.timeout, async {
            let affected = sqlx::query("UPDATE comments SET content = $1 WHERE id = $2")
                .bind(&comment.content)
                .bind(comment.id)
                .execute(&self.db)
                .await?
                .rows_affected();
            if affected == 0 {
                return Err(StoreError::NotFound);
            }
            Ok::<_, StoreError>(comment.clone())
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
