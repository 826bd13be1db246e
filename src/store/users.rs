use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;

use super::{with_timeout, Role, StoreError, UsersRepo};
use crate::auth::password::Password;

const DEFAULT_ROLE: &str = "user";

/// User record. The password hash is never serialized, so cached snapshots
/// and API responses carry no credential material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: Password,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_active: bool,
    pub role_id: i64,
    pub role: Role,
}

/// Registration input; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: Password,
}

/// Only the SHA-256 hex digest of an invitation token is ever stored.
pub fn hash_token(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    created_at: OffsetDateTime,
    is_active: bool,
    role_id: i64,
    role_name: String,
    role_level: i32,
    role_description: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            email: r.email,
            password: Password::from_hash(r.password),
            created_at: r.created_at,
            is_active: r.is_active,
            role_id: r.role_id,
            role: Role {
                id: r.role_id,
                name: r.role_name,
                level: r.role_level,
                description: r.role_description,
            },
        }
    }
}

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.password, u.created_at, u.is_active,
           r.id AS role_id, r.name AS role_name, r.level AS role_level,
           r.description AS role_description
    FROM users u
    JOIN roles r ON u.role_id = r.id
"#;

pub struct PgUsers {
    db: PgPool,
    timeout: Duration,
}

impl PgUsers {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn insert_tx(
        tx: &mut Transaction<'_, Postgres>,
        user: &NewUser,
    ) -> Result<(i64, OffsetDateTime), StoreError> {
        let row: (i64, OffsetDateTime) = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password, role_id)
            VALUES ($1, $2, $3, (SELECT id FROM roles WHERE name = $4))
            RETURNING id, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.password.hash())
        .bind(DEFAULT_ROLE)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl UsersRepo for PgUsers {
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE u.id = $1"))
                .bind(id)
                .fetch_one(&self.db)
                .await?;
            Ok::<_, StoreError>(row.into())
        })
        .await
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        with_timeout(self.timeout, async {
            let row = sqlx::query_as::<_, UserRow>(&format!(
                "{SELECT_USER} WHERE u.email = $1 AND u.is_active = true"
            ))
            .bind(email)
            .fetch_one(&self.db)
            .await?;
            Ok::<_, StoreError>(row.into())
        })
        .await
    }

    async fn create_and_invite(
        &self,
        user: NewUser,
        plain_token: &str,
        invitation_ttl: time::Duration,
    ) -> Result<User, StoreError> {
        let created = with_timeout(self.timeout, async {
            let mut tx = self.db.begin().await?;
            let (id, _) = Self::insert_tx(&mut tx, &user).await?;
            sqlx::query(
                r#"
                INSERT INTO users_invitations (token, user_id, expiry)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(hash_token(plain_token))
            .bind(id)
            .bind(OffsetDateTime::now_utc() + invitation_ttl)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(id)
        })
        .await?;

        debug!(user_id = created, "user created with invitation");
        self.get_by_id(created).await
    }

    async fn activate(&self, plain_token: &str) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            let mut tx = self.db.begin().await?;
            let user_id: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT user_id
                FROM users_invitations
                WHERE token = $1 AND expiry > $2
                "#,
            )
            .bind(hash_token(plain_token))
            .bind(OffsetDateTime::now_utc())
            .fetch_optional(&mut *tx)
            .await?;
            let user_id = user_id.ok_or(StoreError::NotFound)?;

            sqlx::query("UPDATE users SET is_active = true WHERE id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM users_invitations WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        with_timeout(self.timeout, async {
            let mut tx = self.db.begin().await?;
            sqlx::query("DELETE FROM users_invitations WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
