//! Order Repository
//!
//! Order headers are read joined with the customer's contact fields (LEFT
//! JOIN: `user_id` is nulled when the user goes away) and lines joined with
//! the product's display fields.

use super::RepoResult;
use shared::models::{Order, OrderItemDetail, OrderStatus};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

const ORDER_SELECT: &str = "SELECT o.id, o.user_id, o.total_amount, o.status, o.delivery_address, \
     o.delivery_date, o.notes, o.created_at, o.updated_at, \
     u.first_name, u.last_name, u.email, u.phone \
     FROM orders o LEFT JOIN users u ON u.id = o.user_id";

const ITEM_SELECT: &str = "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price, \
     p.name, p.icon, p.description \
     FROM order_items oi JOIN products p ON p.id = oi.product_id";

/// Header fields of a new order
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: i64,
    pub total_amount: f64,
    pub delivery_address: &'a str,
    pub delivery_date: &'a str,
    pub notes: Option<&'a str>,
}

/// Ownership and status of an order, read inside a transaction
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderState {
    pub user_id: Option<i64>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct LineQuantity {
    pub product_id: i64,
    pub quantity: i64,
}

/// Fetch one order with its lines
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE o.id = ?");
    let Some(mut order) = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };
    order.items = find_items(pool, id).await?;
    Ok(Some(order))
}

pub async fn find_items<'e>(
    executor: impl SqliteExecutor<'e>,
    order_id: i64,
) -> RepoResult<Vec<OrderItemDetail>> {
    let sql = format!("{ITEM_SELECT} WHERE oi.order_id = ? ORDER BY oi.id");
    let rows = sqlx::query_as::<_, OrderItemDetail>(&sql)
        .bind(order_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Newest-first listing, optionally scoped to one customer and/or status
pub async fn list(
    pool: &SqlitePool,
    user_id: Option<i64>,
    status: Option<OrderStatus>,
    limit: i64,
    offset: i64,
) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{ORDER_SELECT} WHERE (?1 IS NULL OR o.user_id = ?1) AND (?2 IS NULL OR o.status = ?2) \
         ORDER BY o.created_at DESC, o.id DESC LIMIT ?3 OFFSET ?4"
    );
    let mut orders = sqlx::query_as::<_, Order>(&sql)
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    if orders.is_empty() {
        return Ok(orders);
    }

    // One query for the lines of the whole page
    let placeholders = vec!["?"; orders.len()].join(", ");
    let sql = format!("{ITEM_SELECT} WHERE oi.order_id IN ({placeholders}) ORDER BY oi.id");
    let mut query = sqlx::query_as::<_, OrderItemDetail>(&sql);
    for order in &orders {
        query = query.bind(order.id);
    }
    let mut by_order: HashMap<i64, Vec<OrderItemDetail>> = HashMap::new();
    for item in query.fetch_all(pool).await? {
        by_order.entry(item.order_id).or_default().push(item);
    }
    for order in &mut orders {
        order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
}

pub async fn insert_header(
    conn: &mut SqliteConnection,
    order: &NewOrder<'_>,
    now: i64,
) -> RepoResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO orders (user_id, total_amount, status, delivery_address, delivery_date, notes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(order.user_id)
    .bind(order.total_amount)
    .bind(OrderStatus::Pending)
    .bind(order.delivery_address)
    .bind(order.delivery_date)
    .bind(order.notes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    price: f64,
) -> RepoResult<()> {
    sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)")
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Bump `updated_at`; `false` when the order does not exist.
///
/// Used as the first statement of a status transaction so the write lock is
/// taken before the status is read.
pub async fn touch(conn: &mut SqliteConnection, id: i64, now: i64) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE orders SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(rows > 0)
}

pub async fn find_state(conn: &mut SqliteConnection, id: i64) -> RepoResult<Option<OrderState>> {
    let row = sqlx::query_as::<_, OrderState>("SELECT user_id, status FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: OrderStatus,
    now: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Cancel an owned order still in `pending`/`confirmed`; `false` if no row matched
pub async fn cancel_if_cancellable(
    conn: &mut SqliteConnection,
    id: i64,
    user_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET status = ?, updated_at = ? \
         WHERE id = ? AND user_id = ? AND status IN (?, ?)",
    )
    .bind(OrderStatus::Cancelled)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .bind(OrderStatus::Pending)
    .bind(OrderStatus::Confirmed)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows > 0)
}

pub async fn line_quantities(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> RepoResult<Vec<LineQuantity>> {
    let rows = sqlx::query_as::<_, LineQuantity>(
        "SELECT product_id, quantity FROM order_items WHERE order_id = ? ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
