//! Order workflows
//!
//! - [`placement`]: validate a cart and reserve stock atomically
//! - [`lifecycle`]: customer cancellation and admin status changes
//! - [`money`]: decimal arithmetic for totals
//!
//! Listing and single-order reads live here.

pub mod lifecycle;
pub mod money;
pub mod placement;

pub use lifecycle::{cancel_order, update_status};
pub use placement::place_order;

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderQuery, OrderStatus};
use sqlx::SqlitePool;

use crate::auth::CurrentUser;
use crate::db::repository::order as order_repo;
use crate::error::ServiceResult;

/// Page size cap for order listings
pub const MAX_PAGE_SIZE: i64 = 200;

/// Whose orders a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Owner(i64),
    All,
}

pub(crate) fn order_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"))
}

/// Re-read an order after a committed write
pub(crate) async fn fetch_order(pool: &SqlitePool, id: i64) -> ServiceResult<Order> {
    order_repo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| order_not_found(id).into())
}

/// Parse the optional `status` filter; empty and `all` mean no filter
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<OrderStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::validation),
    }
}

/// Newest-first page of orders with their lines
pub async fn list_orders(
    pool: &SqlitePool,
    scope: OrderScope,
    query: &OrderQuery,
) -> ServiceResult<Vec<Order>> {
    let status = parse_status_filter(query.status.as_deref())?;
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.max(0);
    let user_id = match scope {
        OrderScope::Owner(id) => Some(id),
        OrderScope::All => None,
    };
    Ok(order_repo::list(pool, user_id, status, limit, offset).await?)
}

/// One order; customers only see their own, anything else reads as missing
pub async fn get_order(pool: &SqlitePool, user: &CurrentUser, id: i64) -> ServiceResult<Order> {
    let order = fetch_order(pool, id).await?;
    if !user.is_admin() && order.user_id != Some(user.id) {
        return Err(order_not_found(id).into());
    }
    Ok(order)
}
