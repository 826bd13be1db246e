//! Ownership and role-precedence checks wrapped around mutating handlers.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use tracing::{error, warn};

use super::extractors::CurrentUser;
use crate::{
    error::ApiError,
    state::AppState,
    store::{Comment, Post, RolesRepo, StoreError, User},
};

/// Role a non-owner must hold (or outrank) to pass a guard.
pub trait RequiredRole: Send + Sync + 'static {
    const NAME: &'static str;
}

pub struct Moderator;
pub struct Admin;

impl RequiredRole for Moderator {
    const NAME: &'static str = "moderator";
}

impl RequiredRole for Admin {
    const NAME: &'static str = "admin";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Privileged,
    Denied,
}

/// Owners pass without a role lookup; anyone else needs a role level at
/// least that of `required`.
pub async fn check_access(
    roles: &dyn RolesRepo,
    caller: &User,
    owner_id: i64,
    required: &str,
) -> Result<Access, StoreError> {
    if caller.id == owner_id {
        return Ok(Access::Owner);
    }
    let role = roles.get_by_name(required).await?;
    if caller.role.level >= role.level {
        Ok(Access::Privileged)
    } else {
        Ok(Access::Denied)
    }
}

async fn enforce<R: RequiredRole>(
    state: &AppState,
    caller: &User,
    owner_id: i64,
) -> Result<(), ApiError> {
    match check_access(state.storage.roles.as_ref(), caller, owner_id, R::NAME).await {
        Ok(Access::Owner | Access::Privileged) => Ok(()),
        Ok(Access::Denied) => {
            warn!(user_id = caller.id, required = R::NAME, "user has no privileges to perform this action");
            Err(ApiError::Forbidden)
        }
        Err(e) => {
            error!(error = %e, required = R::NAME, "role lookup failed");
            Err(ApiError::Internal)
        }
    }
}

pub async fn authorize_post<R: RequiredRole>(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Extension(post): Extension<Post>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce::<R>(&state, &user, post.user_id).await?;
    Ok(next.run(req).await)
}

pub async fn authorize_comment<R: RequiredRole>(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Extension(comment): Extension<Comment>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce::<R>(&state, &user, comment.user_id).await?;
    Ok(next.run(req).await)
}
