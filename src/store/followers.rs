use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{with_timeout, FollowersRepo, StoreError};

/// Follow edges are stored as `(user_id = followed, follower_id = follower)`.
pub struct PgFollowers {
    db: PgPool,
    timeout: Duration,
}

impl PgFollowers {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl FollowersRepo for PgFollowers {
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        // A duplicate edge hits the primary key and maps to AlreadyExists.
        with_timeout(self.timeout, async {
            sqlx::query("INSERT INTO followers (user_id, follower_id) VALUES ($1, $2)")
                .bind(followed_id)
                .bind(follower_id)
                .execute(&self.db)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follower_id = $2")
                .bind(followed_id)
                .bind(follower_id)
                .execute(&self.db)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
