//! Operational endpoints: liveness and a basic-auth protected debug dump.

use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};
use serde::Serialize;

use crate::{auth::middleware::basic_auth, state::AppState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub env: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DebugVars {
    pub version: &'static str,
    pub env: String,
    pub uptime_secs: u64,
    pub cache_enabled: bool,
    pub rate_limiter_enabled: bool,
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new().route("/health", get(health)).route(
        "/debug/vars",
        get(debug_vars).route_layer(from_fn_with_state(state, basic_auth)),
    )
}

pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        env: state.config.env.clone(),
        version: VERSION,
    })
}

pub async fn debug_vars(State(state): State<AppState>) -> Json<DebugVars> {
    Json(DebugVars {
        version: VERSION,
        env: state.config.env.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        cache_enabled: state.users.cache_enabled(),
        rate_limiter_enabled: state.config.rate_limiter.enabled,
    })
}
