//! Cancellation and admin status changes
//!
//! Both run in one transaction whose first statement is a write, so the
//! status read afterwards cannot change under us.

use shared::error::{AppError, ErrorCode};
use shared::models::{Order, OrderStatus};
use shared::util::now_millis;
use sqlx::{SqliteConnection, SqlitePool};

use super::{fetch_order, order_not_found, placement::reserve_line};
use crate::auth::CurrentUser;
use crate::db::repository::order as order_repo;
use crate::db::repository::product as product_repo;
use crate::error::ServiceResult;

/// Customer cancellation of an own `pending`/`confirmed` order
pub async fn cancel_order(pool: &SqlitePool, user: &CurrentUser, id: i64) -> ServiceResult<Order> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    if !order_repo::cancel_if_cancellable(&mut *tx, id, user.id, now).await? {
        let err = match order_repo::find_state(&mut *tx, id).await? {
            Some(state) if state.user_id == Some(user.id) => AppError::with_message(
                ErrorCode::OrderNotCancellable,
                format!("Order {id} cannot be cancelled in status {}", state.status),
            )
            .with_detail("status", state.status.as_str()),
            _ => order_not_found(id),
        };
        return Err(err.into());
    }

    let restored = release_lines(&mut *tx, id, now).await?;
    tx.commit().await?;

    tracing::info!(order_id = id, user_id = user.id, restored, "Order cancelled");
    fetch_order(pool, id).await
}

/// Admin status change.
///
/// Leaving the stock-holding states releases the lines; coming back from
/// `cancelled` reserves them again and fails if stock ran out meanwhile.
pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    new_status: OrderStatus,
) -> ServiceResult<Order> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    if !order_repo::touch(&mut *tx, id, now).await? {
        return Err(order_not_found(id).into());
    }
    let state = order_repo::find_state(&mut *tx, id)
        .await?
        .ok_or_else(|| order_not_found(id))?;

    if state.status == new_status {
        // Dropping the transaction discards the touch
        drop(tx);
        return fetch_order(pool, id).await;
    }

    match (state.status.holds_stock(), new_status.holds_stock()) {
        (true, false) => {
            release_lines(&mut *tx, id, now).await?;
        }
        (false, true) => {
            for line in order_repo::line_quantities(&mut *tx, id).await? {
                reserve_line(&mut *tx, line.product_id, line.quantity, now).await?;
            }
        }
        _ => {}
    }

    order_repo::set_status(&mut *tx, id, new_status, now).await?;
    tx.commit().await?;

    tracing::info!(order_id = id, from = %state.status, to = %new_status, "Order status changed");
    fetch_order(pool, id).await
}

/// Put every line's quantity back on its product; returns the number of lines
async fn release_lines(conn: &mut SqliteConnection, order_id: i64, now: i64) -> ServiceResult<usize> {
    let lines = order_repo::line_quantities(conn, order_id).await?;
    for line in &lines {
        product_repo::release_stock(conn, line.product_id, line.quantity, now).await?;
    }
    Ok(lines.len())
}
