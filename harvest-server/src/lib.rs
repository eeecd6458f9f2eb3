//! Harvest Server - farm produce ordering service
//!
//! # Module structure
//!
//! ```text
//! harvest-server/src/
//! ├── config.rs      # environment configuration
//! ├── state.rs       # shared application state
//! ├── error.rs       # service-layer error bridging
//! ├── auth/          # JWT, Argon2, access middleware, rate limiting
//! ├── db/            # SQLite pool and repositories
//! ├── orders/        # placement, cancellation and status workflows
//! ├── discord/       # chat channel interactions
//! ├── api/           # HTTP routers and handlers
//! ├── import.rs      # product catalog import command
//! └── utils/         # logging, input validation
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod discord;
pub mod error;
pub mod import;
pub mod orders;
pub mod state;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use config::Config;
pub use state::AppState;

// Security logging macro
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

#[cfg(test)]
pub(crate) mod test_support {
    use shared::models::{Category, Product, ProductInput, Role, User};
    use sqlx::SqlitePool;

    use crate::auth::{CurrentUser, hash_password};
    use crate::db::DbService;
    use crate::db::repository::{product, user};

    /// Fresh in-memory database with migrations applied
    pub async fn test_pool() -> SqlitePool {
        DbService::new("sqlite::memory:").await.unwrap().pool
    }

    pub async fn seed_product(pool: &SqlitePool, name: &str, price: f64, stock: i64) -> Product {
        let input = ProductInput {
            name: name.into(),
            category: Category::Vegetable,
            price,
            description: None,
            icon: None,
            stock,
        };
        product::create(pool, &input, shared::util::now_millis())
            .await
            .unwrap()
    }

    pub async fn seed_user(pool: &SqlitePool, email: &str, role: Role) -> User {
        let new_user = user::NewUser {
            email: email.into(),
            password_hash: hash_password("secret-pass").unwrap(),
            first_name: "Test".into(),
            last_name: "User".into(),
            phone: None,
            address: None,
            role,
        };
        user::create(pool, &new_user, shared::util::now_millis())
            .await
            .unwrap()
    }

    pub fn as_current(user: &User) -> CurrentUser {
        CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }

    pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }
}
