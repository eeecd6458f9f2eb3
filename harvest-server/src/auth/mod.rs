//! Authentication and authorization
//!
//! - [`JwtService`] issues and validates bearer tokens
//! - [`CurrentUser`] is the authenticated caller (also an axum extractor)
//! - [`require_auth`] / [`require_admin`] gate routers
//! - [`rate_limit`] throttles login and registration

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod rate_limit;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::{require_admin, require_auth};
pub use password::{generate_temp_password, hash_password, verify_password};
pub use rate_limit::RateLimiter;
