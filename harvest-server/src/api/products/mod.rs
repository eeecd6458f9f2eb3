//! Product API
//!
//! Reads are public; every mutating route sits behind `require_auth` and
//! `require_admin`.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};

use crate::auth::{require_admin, require_auth};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/products", get(handler::list))
        .route("/api/products/{id}", get(handler::get_by_id))
        .route("/api/products/category/{category}", get(handler::list_by_category));

    let admin = Router::new()
        .route("/api/products", post(handler::create))
        .route(
            "/api/products/{id}",
            put(handler::update).delete(handler::delete),
        )
        .route("/api/products/{id}/stock", patch(handler::update_stock))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(admin)
}
