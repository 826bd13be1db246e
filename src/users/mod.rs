use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/follow", put(handlers::follow_user))
        .route("/users/:id/unfollow", put(handlers::unfollow_user))
}
