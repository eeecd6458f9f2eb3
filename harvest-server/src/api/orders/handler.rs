//! Order API Handlers
//!
//! Thin wrappers over the workflows in [`crate::orders`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::error::{AppError, AppResult};
use shared::models::{CreateOrderRequest, Order, OrderQuery, OrderStatus, StatusUpdateRequest};

use crate::auth::CurrentUser;
use crate::orders::{self, OrderScope};
use crate::state::AppState;

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = orders::place_order(state.pool(), &user, &req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders
pub async fn list_mine(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let list = orders::list_orders(state.pool(), OrderScope::Owner(user.id), &query).await?;
    Ok(Json(list))
}

/// GET /api/orders/admin/all
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let list = orders::list_orders(state.pool(), OrderScope::All, &query).await?;
    Ok(Json(list))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    Ok(Json(orders::get_order(state.pool(), &user, id).await?))
}

/// PATCH /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Order>> {
    Ok(Json(orders::cancel_order(state.pool(), &user, id).await?))
}

/// PATCH /api/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> AppResult<Json<Order>> {
    let status: OrderStatus = req.status.parse().map_err(AppError::validation)?;
    let order = orders::update_status(state.pool(), id, status).await?;
    tracing::info!(order_id = id, admin_id = admin.id, status = %status, "Order status set by admin");
    Ok(Json(order))
}
