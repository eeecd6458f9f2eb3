//! Application state

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{JwtService, RateLimiter};
use crate::config::Config;
use crate::db::DbService;
use crate::discord::InteractionVerifier;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fixed delay applied to every login attempt
const LOGIN_FIXED_DELAY: Duration = Duration::from_millis(500);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: DbService,
    pub jwt: Arc<JwtService>,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
    /// `None` when no chat application key is configured
    pub discord: Option<Arc<InteractionVerifier>>,
    pub login_delay: Duration,
}

impl AppState {
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let db = DbService::new(&config.database_url).await?;

        let discord = match &config.discord_public_key {
            Some(key) => Some(Arc::new(InteractionVerifier::from_hex(key)?)),
            None => {
                tracing::warn!("DISCORD_PUBLIC_KEY not set, chat interactions are disabled");
                None
            }
        };

        crate::error::expose_internal_errors(config.is_development());

        Ok(Self {
            db,
            jwt: Arc::new(JwtService::with_config(config.jwt.clone())),
            rate_limiter: RateLimiter::new(),
            discord,
            login_delay: LOGIN_FIXED_DELAY,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db.pool
    }
}
