//! User API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/users/register | POST | none, 3/min per IP |
//! | /api/users/login | POST | none, 5/min per IP |
//! | /api/users/profile | GET, PUT | bearer |
//! | /api/users/change-password | POST | bearer |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::auth::require_auth;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/api/users/register", post(handler::register))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            register_rate_limit,
        ));

    let login = Router::new()
        .route("/api/users/login", post(handler::login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    let account = Router::new()
        .route(
            "/api/users/profile",
            get(handler::profile).put(handler::update_profile),
        )
        .route("/api/users/change-password", post(handler::change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    register.merge(login).merge(account)
}
