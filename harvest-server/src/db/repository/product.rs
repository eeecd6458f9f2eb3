//! Product Repository
//!
//! Every write that touches `stock` also writes the derived `availability`
//! in the same statement or transaction.

use super::{RepoError, RepoResult};
use shared::models::{Availability, Category, Product, ProductInput};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{SqliteConnection, SqlitePool};

const PRODUCT_COLUMNS: &str =
    "id, name, category, price, description, icon, stock, availability, created_at, updated_at";

/// Result of a successful conditional stock decrement
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReservedLine {
    pub stock: i64,
    pub name: String,
    pub price: f64,
}

pub async fn find_all(
    pool: &SqlitePool,
    category: Option<Category>,
    availability: Option<Availability>,
) -> RepoResult<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products \
         WHERE (?1 IS NULL OR category = ?1) AND (?2 IS NULL OR availability = ?2) \
         ORDER BY category, name"
    );
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(category)
        .bind(availability)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> RepoResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn create<'e>(
    executor: impl SqliteExecutor<'e>,
    input: &ProductInput,
    now: i64,
) -> RepoResult<Product> {
    let sql = format!(
        "INSERT INTO products (name, category, price, description, icon, stock, availability, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(input.name.trim())
        .bind(input.category)
        .bind(input.price)
        .bind(input.description.as_deref())
        .bind(input.icon.as_deref().unwrap_or(""))
        .bind(input.stock)
        .bind(Availability::from_stock(input.stock))
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await?;
    Ok(row)
}

/// Replace every editable field; `None` when the product does not exist
pub async fn replace<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    input: &ProductInput,
    now: i64,
) -> RepoResult<Option<Product>> {
    let sql = format!(
        "UPDATE products SET name = ?, category = ?, price = ?, description = ?, icon = ?, \
         stock = ?, availability = ?, updated_at = ? WHERE id = ? RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(input.name.trim())
        .bind(input.category)
        .bind(input.price)
        .bind(input.description.as_deref())
        .bind(input.icon.as_deref().unwrap_or(""))
        .bind(input.stock)
        .bind(Availability::from_stock(input.stock))
        .bind(now)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Insert with an explicit id, or overwrite the product holding that id
pub async fn upsert_with_id<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    input: &ProductInput,
    now: i64,
) -> RepoResult<Product> {
    let sql = format!(
        "INSERT INTO products (id, name, category, price, description, icon, stock, availability, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, category = excluded.category, \
         price = excluded.price, description = excluded.description, icon = excluded.icon, \
         stock = excluded.stock, availability = excluded.availability, updated_at = excluded.updated_at \
         RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(input.name.trim())
        .bind(input.category)
        .bind(input.price)
        .bind(input.description.as_deref())
        .bind(input.icon.as_deref().unwrap_or(""))
        .bind(input.stock)
        .bind(Availability::from_stock(input.stock))
        .bind(now)
        .fetch_one(executor)
        .await?;
    Ok(row)
}

/// Set an absolute stock level; `None` when the product does not exist
pub async fn set_stock(
    pool: &SqlitePool,
    id: i64,
    stock: i64,
    now: i64,
) -> RepoResult<Option<Product>> {
    if stock < 0 {
        return Err(RepoError::Validation("Stock must be a non-negative number".into()));
    }
    let sql = format!(
        "UPDATE products SET stock = ?, availability = ?, updated_at = ? WHERE id = ? RETURNING {PRODUCT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(stock)
        .bind(Availability::from_stock(stock))
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows > 0)
}

/// Take `quantity` units if at least that many are in stock.
///
/// The check and the decrement are one statement, so concurrent orders
/// cannot both take the last unit. `None` means the product is missing or
/// short; the caller tells the two apart.
pub async fn reserve_stock(
    conn: &mut SqliteConnection,
    id: i64,
    quantity: i64,
    now: i64,
) -> RepoResult<Option<ReservedLine>> {
    let reserved = sqlx::query_as::<_, ReservedLine>(
        "UPDATE products SET stock = stock - ?1, updated_at = ?2 \
         WHERE id = ?3 AND stock >= ?1 RETURNING stock, name, price",
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(line) = &reserved {
        refresh_availability(conn, id, line.stock).await?;
    }
    Ok(reserved)
}

/// Put `quantity` units back; returns the new stock, `None` if the product is gone
pub async fn release_stock(
    conn: &mut SqliteConnection,
    id: i64,
    quantity: i64,
    now: i64,
) -> RepoResult<Option<i64>> {
    let stock = sqlx::query_scalar::<_, i64>(
        "UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ? RETURNING stock",
    )
    .bind(quantity)
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = stock {
        refresh_availability(conn, id, stock).await?;
    }
    Ok(stock)
}

async fn refresh_availability(conn: &mut SqliteConnection, id: i64, stock: i64) -> RepoResult<()> {
    sqlx::query("UPDATE products SET availability = ? WHERE id = ?")
        .bind(Availability::from_stock(stock))
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Per-category figures logged after an import
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategorySummary {
    pub category: Category,
    pub count: i64,
    pub avg_price: f64,
    pub total_stock: i64,
}

pub async fn category_summary(pool: &SqlitePool) -> RepoResult<Vec<CategorySummary>> {
    let rows = sqlx::query_as::<_, CategorySummary>(
        "SELECT category, COUNT(*) AS count, AVG(price) AS avg_price, SUM(stock) AS total_stock \
         FROM products GROUP BY category ORDER BY category",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_pool;

    fn input(name: &str, stock: i64) -> ProductInput {
        ProductInput {
            name: name.into(),
            category: Category::Vegetable,
            price: 2.5,
            description: Some("Fresh".into()),
            icon: Some("🍅".into()),
            stock,
        }
    }

    #[tokio::test]
    async fn test_create_derives_availability() {
        let pool = test_pool().await;
        let p = create(&pool, &input("Tomato", 500), 1).await.unwrap();
        assert_eq!(p.availability, Availability::Available);
        let p = create(&pool, &input("Pepper", 0), 1).await.unwrap();
        assert_eq!(p.availability, Availability::OutOfStock);
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        let pool = test_pool().await;
        create(&pool, &input("Tomato", 10), 1).await.unwrap();
        create(&pool, &input("Cucumber", 900), 1).await.unwrap();
        let mut apple = input("Apple", 10);
        apple.category = Category::Fruit;
        create(&pool, &apple, 1).await.unwrap();

        let all = find_all(&pool, None, None).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "Cucumber", "Tomato"]);

        let limited = find_all(&pool, Some(Category::Vegetable), Some(Availability::Limited))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].name, "Tomato");
    }

    #[tokio::test]
    async fn test_reserve_stock_is_conditional() {
        let pool = test_pool().await;
        let p = create(&pool, &input("Tomato", 3), 1).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let line = reserve_stock(&mut conn, p.id, 3, 2).await.unwrap().unwrap();
        assert_eq!(line.stock, 0);
        assert!(reserve_stock(&mut conn, p.id, 1, 2).await.unwrap().is_none());
        assert!(reserve_stock(&mut conn, 9999, 1, 2).await.unwrap().is_none());
        drop(conn);

        let p = find_by_id(&pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.stock, 0);
        assert_eq!(p.availability, Availability::OutOfStock);
    }

    #[tokio::test]
    async fn test_release_stock_recomputes_availability() {
        let pool = test_pool().await;
        let p = create(&pool, &input("Mint", 499), 1).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(release_stock(&mut conn, p.id, 1, 2).await.unwrap(), Some(500));
        drop(conn);
        let p = find_by_id(&pool, p.id).await.unwrap().unwrap();
        assert_eq!(p.availability, Availability::Available);
    }

    #[tokio::test]
    async fn test_set_stock_rejects_negative() {
        let pool = test_pool().await;
        let p = create(&pool, &input("Tomato", 5), 1).await.unwrap();
        assert!(matches!(
            set_stock(&pool, p.id, -1, 2).await,
            Err(RepoError::Validation(_))
        ));
        let updated = set_stock(&pool, p.id, 750, 2).await.unwrap().unwrap();
        assert_eq!(updated.availability, Availability::Available);
        assert!(set_stock(&pool, 424242, 1, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_with_id_overwrites() {
        let pool = test_pool().await;
        upsert_with_id(&pool, 7, &input("Tomato", 5), 1).await.unwrap();
        let p = upsert_with_id(&pool, 7, &input("Cherry tomato", 600), 2).await.unwrap();
        assert_eq!(p.id, 7);
        assert_eq!(p.name, "Cherry tomato");
        assert_eq!(p.created_at, 1);
        assert_eq!(p.availability, Availability::Available);
    }
}
