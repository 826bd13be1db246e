mod app;
mod auth;
mod cache;
mod comments;
mod config;
mod error;
mod feed;
mod mailer;
mod ops;
mod posts;
mod ratelimit;
mod state;
mod store;
mod users;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "social=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;
    tracing::info!(env = %state.config.env, cache = state.users.cache_enabled(), "starting server");

    let app = app::build_app(state);
    app::serve(app).await
}
