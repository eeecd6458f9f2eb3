//! Server configuration

use crate::auth::jwt::{JwtConfig, generate_printable_secret};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Minimum JWT secret length outside development
const MIN_JWT_SECRET_LEN: usize = 32;

/// Server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL (`sqlite:harvest.db`, `sqlite::memory:`)
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    pub jwt: JwtConfig,
    /// Allowed CORS origin; `*` allows any
    pub frontend_url: String,
    /// Hex-encoded Ed25519 public key of the chat application
    pub discord_public_key: Option<String>,
    /// `json` for JSON log lines, anything else for text
    pub log_format: String,
}

impl Config {
    /// Require a secret env var: must be set and long enough in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        match std::env::var(name) {
            Ok(val) if val.len() >= MIN_JWT_SECRET_LEN => Ok(val),
            Ok(_) if environment != "development" => {
                Err(format!("{name} must be at least {MIN_JWT_SECRET_LEN} characters").into())
            }
            Err(_) if environment != "development" => {
                Err(format!("{name} must be set in {environment} environment").into())
            }
            _ => {
                tracing::warn!("{name} not set or too short, generating a temporary development key");
                Ok(generate_printable_secret())
            }
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:harvest.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            jwt: JwtConfig {
                secret: Self::require_secret("JWT_SECRET", &environment)?,
                expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1440),
                issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "harvest-server".into()),
            },
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or_else(|_| "*".into()),
            discord_public_key: std::env::var("DISCORD_PUBLIC_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Configuration for tests: in-memory database, fixed secret
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            http_port: 0,
            environment: "development".into(),
            jwt: JwtConfig {
                secret: "test-secret-that-is-long-enough-for-hs256".into(),
                expiration_minutes: 60,
                issuer: "harvest-server".into(),
            },
            frontend_url: "*".into(),
            discord_public_key: None,
            log_format: "text".into(),
        }
    }
}
