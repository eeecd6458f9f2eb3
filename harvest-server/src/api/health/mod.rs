//! Health and service info
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /health | GET | none |
//! | / | GET | none |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(info))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    /// `connected` or `unavailable`
    database: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.db.ping().await {
        "connected"
    } else {
        tracing::warn!("Health check could not reach the database");
        "unavailable"
    };
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "products": "/api/products",
            "users": "/api/users",
            "orders": "/api/orders",
            "discord": "/api/discord/interactions",
        },
    }))
}
