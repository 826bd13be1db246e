//! Read-through cache in front of durable user storage.
//!
//! Entries are populated lazily on first read and expire only by TTL. User
//! mutations do not invalidate them, so a cached snapshot may be stale for up
//! to [`USER_TTL`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::store::{StoreError, User, UsersRepo};

pub mod redis;
#[cfg(test)]
pub mod memory;

pub const USER_TTL: Duration = Duration::from_secs(48 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),
    #[error("cached value is not valid json: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait UserCache: Send + Sync {
    /// `Ok(None)` is a miss, never an error.
    async fn get(&self, user_id: i64) -> Result<Option<User>, CacheError>;
    async fn set(&self, user: &User) -> Result<(), CacheError>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Resolves users by id, consulting the cache first when one is configured.
#[derive(Clone)]
pub struct UserGateway {
    users: Arc<dyn UsersRepo>,
    cache: Option<Arc<dyn UserCache>>,
}

impl UserGateway {
    pub fn new(users: Arc<dyn UsersRepo>, cache: Option<Arc<dyn UserCache>>) -> Self {
        Self { users, cache }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// A failed cache write fails the whole call, even though the durable
    /// read already succeeded.
    #[instrument(skip(self))]
    pub async fn resolve(&self, user_id: i64) -> Result<User, ResolveError> {
        let Some(cache) = &self.cache else {
            return Ok(self.users.get_by_id(user_id).await?);
        };

        if let Some(user) = cache.get(user_id).await? {
            debug!(user_id, "user cache hit");
            return Ok(user);
        }

        debug!(user_id, "user cache miss");
        let user = self.users.get_by_id(user_id).await?;
        cache.set(&user).await?;
        Ok(user)
    }
}
