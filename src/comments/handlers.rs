use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use tracing::{error, instrument, warn};

use super::dto::CommentRequest;
use crate::{
    auth::CurrentUser,
    error::{parse_id, ApiError},
    state::AppState,
    store::{Comment, NewComment, Post, StoreError},
};

/// Loads the comment named by `:id` into the request extensions.
pub async fn load_comment(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id, "comment")?;
    let comment = state.storage.comments.get_by_id(id).await.map_err(|e| {
        match &e {
            StoreError::NotFound => warn!(comment_id = id, "comment not found"),
            other => error!(error = %other, comment_id = id, "error fetching comment"),
        }
        ApiError::from(e)
    })?;
    req.extensions_mut().insert(comment);
    Ok(next.run(req).await)
}

#[instrument(skip_all, fields(post_id = post.id))]
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(post): Extension<Post>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.storage.comments.list_by_post(post.id).await?))
}

#[instrument(skip_all, fields(post_id = post.id, user_id = user.id))]
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Extension(post): Extension<Post>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let comment = state
        .storage
        .comments
        .create(NewComment {
            post_id: post.id,
            user_id: user.id,
            content: payload.content,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[instrument(skip_all, fields(comment_id = comment.id))]
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(mut comment): Extension<Comment>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Json<Comment>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    comment.content = payload.content;
    Ok(Json(state.storage.comments.update(&comment).await?))
}

#[instrument(skip_all, fields(comment_id = comment.id))]
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(comment): Extension<Comment>,
) -> Result<StatusCode, ApiError> {
    state.storage.comments.delete(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
