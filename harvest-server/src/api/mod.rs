//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - liveness and service info
//! - [`products`] - catalog (public reads, admin writes)
//! - [`users`] - registration, login, profile
//! - [`orders`] - order placement and lifecycle
//! - [`discord`] - chat channel interactions
//!
//! Access control is declared per router with `route_layer`, never inside
//! handler bodies.

pub mod discord;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware};
use http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::global_rate_limit;
use crate::state::AppState;

/// Request body ceiling
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build a router with all routes registered (no global middleware)
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(products::router(state))
        .merge(users::router(state))
        .merge(orders::router(state))
        .merge(discord::router(state))
}

/// Fully configured application, used by the server and by tests
pub fn build_app(state: AppState, frontend_url: &str) -> Router {
    build_router(&state)
        .layer(middleware::from_fn_with_state(state.clone(), global_rate_limit))
        .layer(
            ServiceBuilder::new()
                // outermost: request tracing
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(frontend_url))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// `*` allows any origin; otherwise only the configured storefront origin
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if frontend_url.trim() == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(frontend_url.trim()) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, frontend_url, "Invalid FRONTEND_URL, cross-origin requests disabled");
            layer
        }
    }
}
