use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{instrument, warn};

use crate::{
    auth::CurrentUser,
    error::{parse_id, ApiError},
    state::AppState,
    store::{StoreError, User},
};

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&raw_id, "user")?;
    Ok(Json(state.users.resolve(id).await?))
}

#[instrument(skip_all, fields(follower_id = user.id))]
pub async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let followed_id = parse_id(&raw_id, "user")?;
    state
        .storage
        .followers
        .follow(user.id, followed_id)
        .await
        .map_err(|e| {
            if matches!(e, StoreError::AlreadyExists) {
                warn!(followed_id, "already following");
            }
            ApiError::from(e)
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unfollowing someone not followed is not an error.
#[instrument(skip_all, fields(follower_id = user.id))]
pub async fn unfollow_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let followed_id = parse_id(&raw_id, "user")?;
    state.storage.followers.unfollow(user.id, followed_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
