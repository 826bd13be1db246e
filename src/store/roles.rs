use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use super::{with_timeout, RolesRepo, StoreError};

/// Reference data: a named privilege level. Higher `level` means more privileged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub level: i32,
    pub description: String,
}

pub struct PgRoles {
    db: PgPool,
    timeout: Duration,
}

impl PgRoles {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl RolesRepo for PgRoles {
    async fn get_by_name(&self, name: &str) -> Result<Role, StoreError> {
        with_timeout(self.timeout, async {
            let role = sqlx::query_as::<_, Role>(
                r#"
                SELECT id, name, level, description
                FROM roles
                WHERE name = $1
                "#,
            )
            .bind(name)
            .fetch_one(&self.db)
            .await?;
            Ok::<_, StoreError>(role)
        })
        .await
    }
}
