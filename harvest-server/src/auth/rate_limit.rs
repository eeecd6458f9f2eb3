//! Per-IP rate limiting: a global budget on every route, tighter ones on sign-in and registration

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::security_log;
use crate::state::AppState;

struct IpEntry {
    count: u32,
    window_start: Instant,
    window: Duration,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    /// (route, IP) -> entry
    inner: Arc<DashMap<(&'static str, String), IpEntry>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub fn check(&self, route: &'static str, ip: &str, max_requests: u32, window_secs: u64) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);
        let mut entry = self
            .inner
            .entry((route, ip.to_owned()))
            .or_insert_with(|| IpEntry {
                count: 0,
                window_start: now,
                window,
            });

        if now.duration_since(entry.window_start) >= entry.window {
            entry.count = 0;
            entry.window_start = now;
            entry.window = window;
        }

        entry.count += 1;
        entry.count <= max_requests
    }

    /// Remove entries whose window has run out
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.inner
            .retain(|_, entry| now.duration_since(entry.window_start) < entry.window);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Client IP: first `X-Forwarded-For` entry, then the peer address
fn extract_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Every route: 100 requests per 15 minutes per IP
const GLOBAL_MAX_REQUESTS: u32 = 100;
const GLOBAL_WINDOW_SECS: u64 = 900;

/// Signed chat interactions arrive from the chat platform's own addresses
const GLOBAL_EXEMPT_PATHS: &[&str] = &["/api/discord/interactions"];

async fn limit(
    state: &AppState,
    route: &'static str,
    max_requests: u32,
    window_secs: u64,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_ip(&request);
    if !state.rate_limiter.check(route, &ip, max_requests, window_secs) {
        security_log!("WARN", "rate_limited", route = route, ip = ip);
        return AppError::too_many_requests().into_response();
    }
    next.run(request).await
}

/// Applied to the whole router by `build_app`
pub async fn global_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if GLOBAL_EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }
    limit(
        &state,
        "global",
        GLOBAL_MAX_REQUESTS,
        GLOBAL_WINDOW_SECS,
        request,
        next,
    )
    .await
}

/// Login: 5 requests/minute per IP
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    limit(&state, "login", 5, 60, request, next).await
}

/// Chat-account sign-in: 5 requests/minute per IP
pub async fn chat_login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    limit(&state, "chat_login", 5, 60, request, next).await
}

/// Registration: 3 requests/minute per IP
pub async fn register_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    limit(&state, "register", 3, 60, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_route_and_ip() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.check("register", "10.0.0.1", 3, 60));
        }
        assert!(!limiter.check("register", "10.0.0.1", 3, 60));
        // Other IPs and routes keep their own budget
        assert!(limiter.check("register", "10.0.0.2", 3, 60));
        assert!(limiter.check("login", "10.0.0.1", 3, 60));
        assert_eq!(limiter.len(), 3);
    }

    #[test]
    fn test_zero_window_resets_immediately() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("login", "1.1.1.1", 1, 0));
        assert!(limiter.check("login", "1.1.1.1", 1, 0));
    }

    #[test]
    fn test_cleanup_drops_only_expired_windows() {
        let limiter = RateLimiter::new();
        limiter.check("global", "1.1.1.1", 100, 900);
        limiter.check("login", "2.2.2.2", 5, 0);
        limiter.cleanup();
        assert_eq!(limiter.len(), 1);
        // The long window survives cleanup and keeps counting
        for _ in 0..99 {
            assert!(limiter.check("global", "1.1.1.1", 100, 900));
        }
        assert!(!limiter.check("global", "1.1.1.1", 100, 900));
    }
}
