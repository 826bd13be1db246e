use axum::{
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::{
    auth::authz::{authorize_post, Admin, Moderator},
    state::AppState,
};

mod dto;
pub mod handlers;

pub(crate) use dto::check_content;

/// Post routes. Expects the bearer-token layer to be applied by the caller.
pub fn router(state: AppState) -> Router<AppState> {
    let single = Router::new()
        .route(
            "/posts/:id",
            get(handlers::get_post)
                .patch(handlers::update_post.layer(from_fn_with_state(
                    state.clone(),
                    authorize_post::<Moderator>,
                )))
                .delete(handlers::delete_post.layer(from_fn_with_state(
                    state.clone(),
                    authorize_post::<Admin>,
                ))),
        )
        .route_layer(from_fn_with_state(state, handlers::load_post));

    Router::new()
        .route("/posts", post(handlers::create_post))
        .merge(single)
}
