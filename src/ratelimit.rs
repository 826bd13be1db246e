use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Mutex,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{config::RateLimiterConfig, error::ApiError, state::AppState};

/// Fixed-window request counter keyed by client address.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<Windows>,
}

struct Windows {
    clients: HashMap<String, (Instant, u32)>,
    last_sweep: Instant,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(Windows {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn from_config(cfg: &RateLimiterConfig) -> Self {
        Self::new(cfg.requests_per_window, Duration::from_secs(cfg.window_secs))
    }

    /// `Err` carries the time left until the client's window resets.
    pub fn allow(&self, key: &str) -> Result<(), Duration> {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        // Idle clients are swept at most once per window.
        if now.duration_since(windows.last_sweep) >= self.window {
            let window = self.window;
            windows
                .clients
                .retain(|_, (start, _)| now.duration_since(*start) < window);
            windows.last_sweep = now;
        }

        let entry = windows.clients.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        if entry.1 < self.limit {
            entry.1 += 1;
            return Ok(());
        }
        Err(self.window.saturating_sub(now.duration_since(entry.0)))
    }
}

/// Whole seconds until the window resets, rounded up so a client that waits
/// this long is admitted.
fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

fn client_key(peer: Option<SocketAddr>, headers: &HeaderMap) -> String {
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.rate_limiter.enabled {
        let key = client_key(connect_info.map(|ConnectInfo(addr)| addr), req.headers());
        if let Err(retry_after) = state.rate_limiter.allow(&key) {
            warn!(client = %key, ?retry_after, "rate limit exceeded");
            return Err(ApiError::RateLimited {
                retry_after: retry_after_secs(retry_after),
            });
        }
    }
    Ok(next.run(req).await)
}
