//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{ProfileUpdate, Role, User};
use sqlx::SqlitePool;

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, phone, address, role, created_at, updated_at";

/// Fields for a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert a user; a taken email surfaces as [`RepoError::Duplicate`]
pub async fn create(pool: &SqlitePool, user: &NewUser, now: i64) -> RepoResult<User> {
    let sql = format!(
        "INSERT INTO users (email, password_hash, first_name, last_name, phone, address, role, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    );
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.phone.as_deref())
        .bind(user.address.as_deref())
        .bind(user.role)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

/// Apply the provided profile fields; omitted fields keep their value and a
/// blank phone or address clears it
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    update: &ProfileUpdate,
    now: i64,
) -> RepoResult<User> {
    let sql = format!(
        "UPDATE users SET first_name = COALESCE(?1, first_name), last_name = COALESCE(?2, last_name), \
         phone = CASE WHEN ?3 IS NULL THEN phone ELSE NULLIF(?3, '') END, \
         address = CASE WHEN ?4 IS NULL THEN address ELSE NULLIF(?4, '') END, \
         updated_at = ?5 WHERE id = ?6 RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(update.first_name.as_deref().map(str::trim))
        .bind(update.last_name.as_deref().map(str::trim))
        .bind(update.phone.as_deref().map(str::trim))
        .bind(update.address.as_deref().map(str::trim))
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("User {id}")))
}

pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
    now: i64,
) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    if rows == 0 {
        return Err(RepoError::NotFound(format!("User {id}")));
    }
    Ok(())
}
