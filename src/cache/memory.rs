use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Instant,
};

use async_trait::async_trait;

use super::{CacheError, UserCache, USER_TTL};
use crate::store::User;

/// In-process stand-in for the Redis cache, honouring the same TTL.
#[derive(Default)]
pub struct MemoryUserCache {
    entries: Mutex<HashMap<i64, (User, Instant)>>,
    fail_writes: AtomicBool,
}

impl MemoryUserCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, user_id: i64) -> bool {
        self.entries.lock().unwrap().contains_key(&user_id)
    }
}

#[async_trait]
impl UserCache for MemoryUserCache {
    async fn get(&self, user_id: i64) -> Result<Option<User>, CacheError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(&user_id)
            .filter(|(_, stored_at)| stored_at.elapsed() < USER_TTL)
            .map(|(user, _)| user.clone()))
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Redis(::redis::RedisError::from((
                ::redis::ErrorKind::IoError,
                "injected cache write failure",
            ))));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(user.id, (user.clone(), Instant::now()));
        Ok(())
    }
}
