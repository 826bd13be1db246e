use anyhow::Context;
use async_trait::async_trait;
use ::redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::info;

use super::{CacheError, UserCache, USER_TTL};
use crate::store::User;

/// Users cached as JSON strings under `user-{id}` with a fixed expiry.
#[derive(Clone)]
pub struct RedisUserCache {
    conn: ConnectionManager,
}

impl RedisUserCache {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = Client::open(url).context("parse redis url")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("connect to redis")?;
        info!("redis cache connection established");
        Ok(Self { conn })
    }
}

fn cache_key(user_id: i64) -> String {
    format!("user-{}", user_id)
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, user_id: i64) -> Result<Option<User>, CacheError> {
        let mut conn = self.conn.clone();
        let data: Option<String> = conn.get(cache_key(user_id)).await?;
        match data {
            Some(json) if !json.is_empty() => Ok(Some(serde_json::from_str(&json)?)),
            _ => Ok(None),
        }
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        let json = serde_json::to_string(user)?;
        let mut conn = self.conn.clone();
        ::redis::cmd("SET")
            .arg(cache_key(user.id))
            .arg(json)
            .arg("EX")
            .arg(USER_TTL.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
