//! Order API
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /api/orders | POST, GET | bearer |
//! | /api/orders/{id} | GET | bearer (owner or admin) |
//! | /api/orders/{id}/cancel | PATCH | bearer (owner) |
//! | /api/orders/admin/all | GET | admin |
//! | /api/orders/{id}/status | PATCH | admin |

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

use crate::auth::{require_admin, require_auth};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/api/orders", get(handler::list_mine).post(handler::create))
        .route("/api/orders/{id}", get(handler::get_by_id))
        .route("/api/orders/{id}/cancel", patch(handler::cancel))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/api/orders/admin/all", get(handler::list_all))
        .route("/api/orders/{id}/status", patch(handler::update_status))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    customer.merge(admin)
}
