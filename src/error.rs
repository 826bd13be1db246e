use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{jwt::TokenError, password::HashingError},
    cache::ResolveError,
    feed::FeedQueryError,
    store::StoreError,
};

/// Client-facing error taxonomy. Every variant renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("unauthorized")]
    UnauthorizedBasic,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("rate limit exceeded, retry in {retry_after} seconds")]
    RateLimited { retry_after: u64 },
    #[error("the server encountered a problem and could not process your request")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::UnauthorizedBasic => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    /// Logs `err` and returns the opaque 500.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        error!(error = %err, "internal error");
        ApiError::Internal
    }
}

/// Parses a numeric path id; anything else is a 400.
pub fn parse_id(raw: &str, entity: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid {} id", entity)))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        let mut res = (status, body).into_response();

        match self {
            ApiError::UnauthorizedBasic => {
                res.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="restricted", charset="UTF-8""#),
                );
            }
            ApiError::RateLimited { retry_after } => {
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            }
            _ => {}
        }
        res
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound | StoreError::VersionConflict => ApiError::NotFound,
            StoreError::AlreadyExists => ApiError::Conflict("resource already exists".into()),
            StoreError::DuplicateEmail => ApiError::Conflict("a user with that email already exists".into()),
            StoreError::DuplicateUsername => {
                ApiError::Conflict("a user with that username already exists".into())
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Validation(e.body_text())
    }
}

impl From<FeedQueryError> for ApiError {
    fn from(e: FeedQueryError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<HashingError> for ApiError {
    fn from(e: HashingError) -> Self {
        ApiError::internal(e)
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing => ApiError::internal(e),
            _ => ApiError::Unauthorized,
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Store(s) => s.into(),
            ResolveError::Cache(c) => ApiError::internal(c),
        }
    }
}
