use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{error, warn};

use crate::{error::ApiError, state::AppState};

fn authorization(headers: &HeaderMap, scheme: &str) -> Result<String, &'static str> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or("missing auth token")?;
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [s, value] if *s == scheme => Ok(value.to_string()),
        _ => Err("invalid auth header"),
    }
}

/// Resolves `Authorization: Bearer <token>` to a user and stores it in the
/// request extensions. Every failure, backend ones included, is a plain 401.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = authorization(req.headers(), "Bearer").map_err(|reason| {
        warn!(reason, "bearer authentication failed");
        ApiError::Unauthorized
    })?;

    let claims = state.jwt.verify(&token).map_err(|e| {
        warn!(error = %e, "invalid token");
        ApiError::Unauthorized
    })?;
    let user_id = claims.user_id().map_err(|e| {
        warn!(error = %e, sub = %claims.sub, "invalid token subject");
        ApiError::Unauthorized
    })?;

    let user = state.users.resolve(user_id).await.map_err(|e| {
        warn!(error = %e, user_id, "could not resolve token subject");
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Guards the operational surface with the configured basic credentials.
pub async fn basic_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let encoded = authorization(req.headers(), "Basic").map_err(|reason| {
        warn!(reason, "basic authentication failed");
        ApiError::UnauthorizedBasic
    })?;
    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|raw| String::from_utf8(raw).ok())
        .ok_or_else(|| {
            warn!("basic credentials are not valid base64");
            ApiError::UnauthorizedBasic
        })?;

    let cfg = &state.config.basic_auth;
    if cfg.user.is_empty() || cfg.password.is_empty() {
        error!("basic auth credentials are not configured");
        return Err(ApiError::Internal);
    }

    match decoded.split_once(':') {
        Some((user, pass)) if user == cfg.user && pass == cfg.password => Ok(next.run(req).await),
        _ => {
            warn!("wrong basic auth username or password");
            Err(ApiError::UnauthorizedBasic)
        }
    }
}
