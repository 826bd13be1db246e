//! Durable storage: one capability trait per entity, Postgres-backed in
//! production and swapped for in-memory doubles in tests.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::feed::FeedQuery;

pub mod comments;
pub mod followers;
#[cfg(test)]
pub mod memory;
pub mod posts;
pub mod roles;
pub mod users;

pub use comments::{Comment, NewComment};
pub use posts::{NewPost, Post, PostWithMetadata};
pub use roles::Role;
pub use users::{NewUser, User};

/// Postgres SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    AlreadyExists,
    #[error("duplicated email")]
    DuplicateEmail,
    #[error("duplicated username")]
    DuplicateUsername,
    #[error("version conflict")]
    VersionConflict,
    #[error("storage operation timed out")]
    Timeout,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) => {
                let constraint = db.constraint().map(str::to_owned);
                let code = db.code().map(|c| c.into_owned());
                match (constraint.as_deref(), code.as_deref()) {
                    (Some("users_email_key"), _) => StoreError::DuplicateEmail,
                    (Some("users_username_key"), _) => StoreError::DuplicateUsername,
                    (_, Some(UNIQUE_VIOLATION)) => StoreError::AlreadyExists,
                    (_, Some(FOREIGN_KEY_VIOLATION)) => StoreError::NotFound,
                    _ => StoreError::Database(sqlx::Error::Database(db)),
                }
            }
            other => StoreError::Database(other),
        }
    }
}

/// Bounds a storage call by `limit`; an elapsed call surfaces as `Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(StoreError::Timeout),
    }
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError>;
    /// Only active users can be looked up by email.
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;
    /// Inserts an inactive user and its invitation in a single transaction.
    async fn create_and_invite(
        &self,
        user: NewUser,
        plain_token: &str,
        invitation_ttl: time::Duration,
    ) -> Result<User, StoreError>;
    async fn activate(&self, plain_token: &str) -> Result<(), StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RolesRepo: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Role, StoreError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn get_by_id(&self, id: i64) -> Result<Post, StoreError>;
    /// Writes `post` only if the stored version still equals `post.version`.
    async fn update(&self, post: &Post) -> Result<Post, StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
    async fn user_feed(
        &self,
        viewer_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, StoreError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn create(&self, comment: NewComment) -> Result<Comment, StoreError>;
    async fn get_by_id(&self, id: i64) -> Result<Comment, StoreError>;
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn update(&self, comment: &Comment) -> Result<Comment, StoreError>;
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FollowersRepo: Send + Sync {
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError>;
    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UsersRepo>,
    pub roles: Arc<dyn RolesRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub followers: Arc<dyn FollowersRepo>,
}

impl Storage {
    pub fn postgres(db: PgPool, query_timeout: Duration) -> Self {
        Self {
            users: Arc::new(users::PgUsers::new(db.clone(), query_timeout)),
            roles: Arc::new(roles::PgRoles::new(db.clone(), query_timeout)),
            posts: Arc::new(posts::PgPosts::new(db.clone(), query_timeout)),
            comments: Arc::new(comments::PgComments::new(db.clone(), query_timeout)),
            followers: Arc::new(followers::PgFollowers::new(db, query_timeout)),
        }
    }
}
