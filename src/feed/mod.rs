//! Personalized feed: the viewer's own posts plus posts of everyone they follow.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{auth::CurrentUser, error::ApiError, state::AppState, store::PostWithMetadata};

mod query;

pub use query::*;

pub fn router() -> Router<AppState> {
    Router::new().route("/users/feed", get(user_feed))
}

/// GET /users/feed
#[instrument(skip_all, fields(viewer_id = user.id))]
pub async fn user_feed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PostWithMetadata>>, ApiError> {
    let query = FeedQuery::parse(&params).map_err(|e| {
        warn!(error = %e, "invalid feed query");
        ApiError::from(e)
    })?;
    let feed = state.storage.posts.user_feed(user.id, &query).await?;
    Ok(Json(feed))
}
