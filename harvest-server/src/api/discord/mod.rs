//! Discord API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/discord/interactions | POST | Ed25519 signature |
//! | /api/discord/login | POST | none, 5/min per IP |
//! | /api/discord/accounts/{discord_id}/orders | GET | admin |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::rate_limit::chat_login_rate_limit;
use crate::auth::{require_admin, require_auth};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let interactions =
        Router::new().route("/api/discord/interactions", post(handler::interactions));

    let login = Router::new()
        .route("/api/discord/login", post(handler::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            chat_login_rate_limit,
        ));

    let admin = Router::new()
        .route(
            "/api/discord/accounts/{discord_id}/orders",
            get(handler::account_orders),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    interactions.merge(login).merge(admin)
}
