use axum::{
    routing::{post, put},
    Router,
};

use crate::state::AppState;

pub mod authz;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use extractors::CurrentUser;

/// Public routes: registration, token issuing and account activation.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authentication/user", post(handlers::register))
        .route("/authentication/token", post(handlers::create_token))
        .route("/users/activate/:token", put(handlers::activate))
}
