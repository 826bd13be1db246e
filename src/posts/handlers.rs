use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use tracing::{error, instrument, warn};

use super::dto::{CreatePostRequest, PostWithComments, UpdatePostRequest};
use crate::{
    auth::CurrentUser,
    error::{parse_id, ApiError},
    state::AppState,
    store::{NewPost, Post, StoreError},
};

/// Loads the post named by `:id` into the request extensions.
pub async fn load_post(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id, "post")?;
    let post = state.storage.posts.get_by_id(id).await.map_err(|e| {
        match &e {
            StoreError::NotFound => warn!(post_id = id, "post not found"),
            other => error!(error = %other, post_id = id, "error fetching post"),
        }
        ApiError::from(e)
    })?;
    req.extensions_mut().insert(post);
    Ok(next.run(req).await)
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let post = state
        .storage
        .posts
        .create(NewPost {
            user_id: user.id,
            title: payload.title,
            content: payload.content,
            tags: payload.tags,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip_all, fields(post_id = post.id))]
pub async fn get_post(
    State(state): State<AppState>,
    Extension(post): Extension<Post>,
) -> Result<Json<PostWithComments>, ApiError> {
    let comments = state.storage.comments.list_by_post(post.id).await?;
    Ok(Json(PostWithComments { post, comments }))
}

#[instrument(skip_all, fields(post_id = post.id))]
pub async fn update_post(
    State(state): State<AppState>,
    Extension(mut post): Extension<Post>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;
    payload.apply(&mut post);

    let updated = state.storage.posts.update(&post).await.map_err(|e| {
        if matches!(e, StoreError::VersionConflict) {
            warn!(post_id = post.id, version = post.version, "stale post version");
        }
        ApiError::from(e)
    })?;
    Ok(Json(updated))
}

#[instrument(skip_all, fields(post_id = post.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(post): Extension<Post>,
) -> Result<StatusCode, ApiError> {
    state.storage.posts.delete(post.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
