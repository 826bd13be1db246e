use axum::{
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Router,
};

use crate::{
    auth::authz::{authorize_comment, Admin, Moderator},
    posts::handlers::load_post,
    state::AppState,
};

mod dto;
pub mod handlers;

pub fn router(state: AppState) -> Router<AppState> {
    let by_post = Router::new()
        .route(
            "/posts/:id/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route_layer(from_fn_with_state(state.clone(), load_post));

    let single = Router::new()
        .route(
            "/comments/:id",
            patch(handlers::update_comment.layer(from_fn_with_state(
                state.clone(),
                authorize_comment::<Moderator>,
            )))
            .delete(handlers::delete_comment.layer(from_fn_with_state(
                state.clone(),
                authorize_comment::<Admin>,
            ))),
        )
        .route_layer(from_fn_with_state(state, handlers::load_comment));

    by_post.merge(single)
}
