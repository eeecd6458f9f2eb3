//! Order placement
//!
//! Everything the request carries is validated before the database is
//! touched. The transaction then reserves each line with a conditional
//! decrement, so a short line aborts the whole order and nothing persists.

use chrono::{DateTime, NaiveDate};
use shared::error::{AppError, ErrorCode};
use shared::models::{CreateOrderRequest, Order, OrderItemInput};
use shared::util::now_millis;
use sqlx::{SqliteConnection, SqlitePool};

use super::money;
use crate::auth::CurrentUser;
use crate::db::repository::order::{self as order_repo, NewOrder};
use crate::db::repository::product::{self as product_repo, ReservedLine};
use crate::error::ServiceResult;
use crate::utils::validation::{MAX_ADDRESS_LEN, MAX_NOTE_LEN, MIN_ADDRESS_LEN, validate_text_len};

/// Maximum lines per order
pub const MAX_ORDER_LINES: usize = 100;
/// Maximum quantity on one line
pub const MAX_LINE_QUANTITY: i64 = 9999;

/// A request that passed validation, with normalized text fields
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub items: Vec<OrderItemInput>,
    pub delivery_address: String,
    /// `YYYY-MM-DD`
    pub delivery_date: String,
    pub notes: Option<String>,
}

pub fn validate_order(req: &CreateOrderRequest) -> Result<ValidatedOrder, AppError> {
    if req.items.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::OrderEmpty,
            "Order must contain at least one item",
        ));
    }
    if req.items.len() > MAX_ORDER_LINES {
        return Err(AppError::validation(format!(
            "Too many items ({}, max {MAX_ORDER_LINES})",
            req.items.len()
        )));
    }

    for item in &req.items {
        if item.product_id < 1 {
            return Err(AppError::validation(format!(
                "Invalid product id: {}",
                item.product_id
            )));
        }
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) {
            return Err(AppError::with_message(
                ErrorCode::InvalidQuantity,
                format!(
                    "Quantity must be between 1 and {MAX_LINE_QUANTITY}, got {}",
                    item.quantity
                ),
            )
            .with_detail("product_id", item.product_id));
        }
    }

    validate_text_len(
        &req.delivery_address,
        "delivery_address",
        MIN_ADDRESS_LEN,
        MAX_ADDRESS_LEN,
    )?;
    let delivery_date = parse_delivery_date(&req.delivery_date)?;

    let notes = req
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned);
    crate::utils::validation::validate_optional_text(&notes, "notes", MAX_NOTE_LEN)?;

    Ok(ValidatedOrder {
        items: req.items.clone(),
        delivery_address: req.delivery_address.trim().to_owned(),
        delivery_date,
        notes,
    })
}

/// Accept `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date
pub fn parse_delivery_date(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::InvalidDeliveryDate,
                format!("Invalid delivery date: {raw}"),
            )
        })?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Take `quantity` units of a product or fail with the reason.
///
/// Missing product and short stock are told apart only after the
/// conditional decrement matched nothing.
pub(crate) async fn reserve_line(
    conn: &mut SqliteConnection,
    product_id: i64,
    quantity: i64,
    now: i64,
) -> ServiceResult<ReservedLine> {
    if let Some(line) = product_repo::reserve_stock(conn, product_id, quantity, now).await? {
        return Ok(line);
    }

    let err = match product_repo::find_by_id(&mut *conn, product_id).await? {
        None => AppError::with_message(
            ErrorCode::ProductNotFound,
            format!("Product {product_id} not found"),
        )
        .with_detail("product_id", product_id),
        Some(product) => AppError::with_message(
            ErrorCode::InsufficientStock,
            format!(
                "Insufficient stock for {}: {} available, {} requested",
                product.name, product.stock, quantity
            ),
        )
        .with_detail("product_id", product_id)
        .with_detail("available", product.stock)
        .with_detail("requested", quantity),
    };
    Err(err.into())
}

/// Place an order for the current user
pub async fn place_order(
    pool: &SqlitePool,
    user: &CurrentUser,
    req: &CreateOrderRequest,
) -> ServiceResult<Order> {
    let order = validate_order(req)?;
    let now = now_millis();

    let mut tx = pool.begin().await?;

    let mut priced = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let reserved = match reserve_line(&mut *tx, item.product_id, item.quantity, now).await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(user_id = user.id, product_id = item.product_id, "Order rejected");
                return Err(e);
            }
        };
        priced.push((item.product_id, item.quantity, reserved.price));
    }

    let total_amount = money::order_total(priced.iter().map(|&(_, qty, price)| (price, qty)));

    let order_id = order_repo::insert_header(
        &mut *tx,
        &NewOrder {
            user_id: user.id,
            total_amount,
            delivery_address: &order.delivery_address,
            delivery_date: &order.delivery_date,
            notes: order.notes.as_deref(),
        },
        now,
    )
    .await?;

    for &(product_id, quantity, price) in &priced {
        order_repo::insert_item(&mut *tx, order_id, product_id, quantity, price).await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_id,
        user_id = user.id,
        lines = priced.len(),
        total_amount,
        "Order placed"
    );

    super::fetch_order(pool, order_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::product;
    use crate::test_support::{as_current, count_rows, seed_product, seed_user, test_pool};
    use shared::models::{Availability, OrderStatus, ProductInput, Role};

    fn request(items: &[(i64, i64)]) -> CreateOrderRequest {
        CreateOrderRequest {
            items: items
                .iter()
                .map(|&(product_id, quantity)| OrderItemInput {
                    product_id,
                    quantity,
                })
                .collect(),
            delivery_address: "12 Orchard Lane, Springfield".into(),
            delivery_date: "2030-05-01".into(),
            notes: None,
        }
    }

    async fn customer(pool: &SqlitePool, email: &str) -> CurrentUser {
        as_current(&seed_user(pool, email, Role::Customer).await)
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let err = validate_order(&request(&[])).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);

        let err = validate_order(&request(&[(1, 0)])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);

        let err = validate_order(&request(&[(1, 10_000)])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);

        let err = validate_order(&request(&[(0, 1)])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let mut short_address = request(&[(1, 1)]);
        short_address.delivery_address = "  here  ".into();
        assert_eq!(
            validate_order(&short_address).unwrap_err().code,
            ErrorCode::ValidationFailed
        );

        let mut bad_date = request(&[(1, 1)]);
        bad_date.delivery_date = "next tuesday".into();
        assert_eq!(
            validate_order(&bad_date).unwrap_err().code,
            ErrorCode::InvalidDeliveryDate
        );
    }

    #[test]
    fn test_delivery_date_accepts_timestamp() {
        assert_eq!(parse_delivery_date("2030-05-01").unwrap(), "2030-05-01");
        assert_eq!(
            parse_delivery_date("2030-05-01T09:30:00Z").unwrap(),
            "2030-05-01"
        );
        assert!(parse_delivery_date("2030-02-30").is_err());
    }

    #[tokio::test]
    async fn test_order_crossing_threshold_becomes_limited() {
        let pool = test_pool().await;
        let user = customer(&pool, "ana@example.com").await;
        let p = seed_product(&pool, "Carrot", 1.25, 500).await;
        assert_eq!(p.availability, Availability::Available);

        let order = place_order(&pool, &user, &request(&[(p.id, 1)]))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 1.25);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].name, "Carrot");
        assert_eq!(order.email.as_deref(), Some("ana@example.com"));

        let p = product::find_by_id(&pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 499);
        assert_eq!(p.availability, Availability::Limited);
    }

    #[tokio::test]
    async fn test_short_line_rolls_back_whole_order() {
        let pool = test_pool().await;
        let user = customer(&pool, "ana@example.com").await;
        let plenty = seed_product(&pool, "Potato", 0.8, 100).await;
        let scarce = seed_product(&pool, "Saffron", 12.0, 2).await;

        let err: AppError = place_order(&pool, &user, &request(&[(plenty.id, 10), (scarce.id, 3)]))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("Saffron"));
        let details = err.details.unwrap();
        assert_eq!(details["available"], 2);
        assert_eq!(details["requested"], 3);

        assert_eq!(count_rows(&pool, "orders").await, 0);
        assert_eq!(count_rows(&pool, "order_items").await, 0);
        let plenty = product::find_by_id(&pool, plenty.id).await.unwrap().unwrap();
        assert_eq!(plenty.stock, 100);
        let scarce = product::find_by_id(&pool, scarce.id).await.unwrap().unwrap();
        assert_eq!(scarce.stock, 2);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let pool = test_pool().await;
        let user = customer(&pool, "ana@example.com").await;
        let err: AppError = place_order(&pool, &user, &request(&[(999, 1)]))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
        assert!(err.message.contains("999"));
    }

    #[tokio::test]
    async fn test_repeated_product_lines_decrement_in_turn() {
        let pool = test_pool().await;
        let user = customer(&pool, "ana@example.com").await;
        let p = seed_product(&pool, "Basil", 1.99, 5).await;

        let order = place_order(&pool, &user, &request(&[(p.id, 3), (p.id, 2)]))
            .await
            .unwrap();
        assert_eq!(order.total_amount, 9.95);
        let p = product::find_by_id(&pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.availability, Availability::OutOfStock);
    }

    #[tokio::test]
    async fn test_snapshot_price_survives_price_change() {
        let pool = test_pool().await;
        let user = customer(&pool, "ana@example.com").await;
        let p = seed_product(&pool, "Leek", 2.0, 50).await;
        let order = place_order(&pool, &user, &request(&[(p.id, 2)]))
            .await
            .unwrap();

        let update = ProductInput {
            name: p.name.clone(),
            category: p.category,
            price: 3.5,
            description: None,
            icon: None,
            stock: 48,
        };
        product::replace(&pool, p.id, &update, now_millis())
            .await
            .unwrap();

        let reread = crate::orders::fetch_order(&pool, order.id).await.unwrap();
        assert_eq!(reread.items[0].price, 2.0);
        assert_eq!(reread.total_amount, 4.0);
    }

    #[tokio::test]
    async fn test_concurrent_orders_for_last_unit() {
        let pool = test_pool().await;
        let first = customer(&pool, "a@example.com").await;
        let second = customer(&pool, "b@example.com").await;
        let p = seed_product(&pool, "Truffle", 40.0, 1).await;

        let req = request(&[(p.id, 1)]);
        let (a, b) = tokio::join!(
            place_order(&pool, &first, &req),
            place_order(&pool, &second, &req)
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let failure = outcomes.into_iter().find_map(Result::err).unwrap();
        let err: AppError = failure.into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let p = product::find_by_id(&pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.availability, Availability::OutOfStock);
    }

    /// On-disk database removed (with its WAL side files) when dropped
    struct TempDb {
        path: std::path::PathBuf,
    }

    impl TempDb {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "harvest-{name}-{}-{}.db",
                std::process::id(),
                now_millis()
            ));
            Self { path }
        }

        fn url(&self) -> String {
            format!("sqlite:{}", self.path.display())
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_orders_on_shared_database_never_oversell() {
        let temp = TempDb::new("oversell");
        let pool = crate::db::DbService::new(&temp.url()).await.unwrap().pool;
        let user = customer(&pool, "rush@example.com").await;
        let p = seed_product(&pool, "Saffron", 12.0, 5).await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let pool = pool.clone();
                let user = user.clone();
                let req = request(&[(p.id, 1)]);
                tokio::spawn(async move { place_order(&pool, &user, &req).await })
            })
            .collect();

        let mut placed = 0;
        let mut failures = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(e) => failures.push(AppError::from(e).code),
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(failures.len(), 15);
        assert!(
            failures.iter().all(|c| *c == ErrorCode::InsufficientStock),
            "unexpected failures: {failures:?}"
        );

        let p = product::find_by_id(&pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.availability, Availability::OutOfStock);
        assert_eq!(count_rows(&pool, "orders").await, 5);
        assert_eq!(count_rows(&pool, "order_items").await, 5);

        pool.close().await;
    }
}
