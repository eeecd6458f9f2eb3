//! Chat Channel Repository

use super::{RepoError, RepoResult};
use shared::models::{ChatAccount, ChatOrder, DeliveryZone};
use sqlx::SqlitePool;

const ACCOUNT_COLUMNS: &str = "id, discord_id, username, email, password_hash, full_name, phone, is_active, created_at, last_login";

const ORDER_COLUMNS: &str = "id, account_id, discord_id, products, unit_count, products_total, delivery_zone, \
     delivery_cost, total_amount, delivery_address, status, created_at";

#[derive(Debug, Clone)]
pub struct NewChatAccount {
    pub discord_id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewChatOrder {
    pub account_id: i64,
    pub discord_id: String,
    pub products: String,
    pub unit_count: i64,
    pub products_total: f64,
    pub delivery_zone: DeliveryZone,
    pub delivery_cost: f64,
    pub total_amount: f64,
    pub delivery_address: String,
}

pub async fn find_account_by_discord_id(
    pool: &SqlitePool,
    discord_id: &str,
) -> RepoResult<Option<ChatAccount>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM chat_accounts WHERE discord_id = ?");
    let row = sqlx::query_as::<_, ChatAccount>(&sql)
        .bind(discord_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_account_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<ChatAccount>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM chat_accounts WHERE email = ?");
    let row = sqlx::query_as::<_, ChatAccount>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn record_login(pool: &SqlitePool, id: i64, now: i64) -> RepoResult<ChatAccount> {
    let sql = format!("UPDATE chat_accounts SET last_login = ? WHERE id = ? RETURNING {ACCOUNT_COLUMNS}");
    sqlx::query_as::<_, ChatAccount>(&sql)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Chat account {id}")))
}

/// Whether the member or the email already has an account
pub async fn account_exists(pool: &SqlitePool, discord_id: &str, email: &str) -> RepoResult<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM chat_accounts WHERE discord_id = ? OR email = ?",
    )
    .bind(discord_id)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn create_account(
    pool: &SqlitePool,
    account: &NewChatAccount,
    now: i64,
) -> RepoResult<ChatAccount> {
    let sql = format!(
        "INSERT INTO chat_accounts (discord_id, username, email, password_hash, full_name, phone, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, 1, ?) RETURNING {ACCOUNT_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ChatAccount>(&sql)
        .bind(&account.discord_id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.full_name)
        .bind(account.phone.as_deref())
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn create_order(pool: &SqlitePool, order: &NewChatOrder, now: i64) -> RepoResult<ChatOrder> {
    let sql = format!(
        "INSERT INTO chat_orders (account_id, discord_id, products, unit_count, products_total, delivery_zone, \
         delivery_cost, total_amount, delivery_address, status, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?) RETURNING {ORDER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ChatOrder>(&sql)
        .bind(order.account_id)
        .bind(&order.discord_id)
        .bind(&order.products)
        .bind(order.unit_count)
        .bind(order.products_total)
        .bind(order.delivery_zone)
        .bind(order.delivery_cost)
        .bind(order.total_amount)
        .bind(&order.delivery_address)
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn list_orders_by_discord_id(
    pool: &SqlitePool,
    discord_id: &str,
) -> RepoResult<Vec<ChatOrder>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM chat_orders WHERE discord_id = ? ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ChatOrder>(&sql)
        .bind(discord_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
