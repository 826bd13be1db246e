use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_email: String,
    pub sendgrid_api_key: String,
    pub invitation_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicAuthConfig {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimiterConfig {
    pub enabled: bool,
    pub requests_per_window: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub frontend_url: String,
    pub cors_allowed_origin: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub query_timeout_secs: u64,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub basic_auth: BasicAuthConfig,
    pub rate_limiter: RateLimiterConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "social".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "social".into()),
            ttl_hours: env_parse("JWT_TTL_HOURS", 72),
        };
        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            enabled: env_parse("REDIS_ENABLED", false),
        };
        let mail = MailConfig {
            from_email: std::env::var("FROM_EMAIL").unwrap_or_default(),
            sendgrid_api_key: std::env::var("SENDGRID_API_KEY").unwrap_or_default(),
            invitation_ttl_hours: env_parse("INVITATION_TTL_HOURS", 72),
        };
        let basic_auth = BasicAuthConfig {
            user: std::env::var("BASIC_AUTH_USER").unwrap_or_default(),
            password: std::env::var("BASIC_AUTH_PASSWORD").unwrap_or_default(),
        };
        let rate_limiter = RateLimiterConfig {
            enabled: env_parse("RATE_LIMITER_ENABLED", true),
            requests_per_window: env_parse("RATE_LIMITER_REQUESTS", 20),
            window_secs: env_parse("RATE_LIMITER_WINDOW_SECS", 5),
        };

        Ok(Self {
            env: std::env::var("ENV").unwrap_or_else(|_| "development".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            cors_allowed_origin: std::env::var("CORS_ALLOWED_ORIGIN").unwrap_or_else(|_| "*".into()),
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 30),
            query_timeout_secs: env_parse("QUERY_TIMEOUT_SECS", 5),
            redis,
            jwt,
            mail,
            basic_auth,
            rate_limiter,
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn invitation_ttl(&self) -> time::Duration {
        time::Duration::hours(self.mail.invitation_ttl_hours)
    }
}

/// Reads and parses an env var, keeping `default` when it is unset or unparsable.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
