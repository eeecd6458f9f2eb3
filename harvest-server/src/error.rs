//! Service-layer error type
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, [`RepoError`]) and
//! the API-layer [`AppError`], so workflows propagate both with `?`.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::repository::RepoError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// When set, internal error text is attached to 500 responses
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Enable internal error details in responses (development only)
pub fn expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

/// Service-layer error
///
/// - `Db`: database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<RepoError> for ServiceError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Database(msg) => ServiceError::Db(msg.into()),
            other => ServiceError::App(other.into()),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => internal_error(db_err),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(what) => AppError::with_message(ErrorCode::NotFound, what),
            RepoError::Duplicate(what) => AppError::with_message(ErrorCode::AlreadyExists, what),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => internal_error(msg),
        }
    }
}

fn internal_error(err: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %err, "Service database error");
    let app_err = AppError::new(ErrorCode::InternalError);
    if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
        app_err.with_detail("error", err.to_string())
    } else {
        app_err
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_pass_through() {
        let err: AppError = ServiceError::App(AppError::new(ErrorCode::InsufficientStock)).into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_db_errors_become_internal() {
        let err: AppError = ServiceError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[test]
    fn test_repo_duplicate_maps_to_already_exists() {
        let err: AppError = RepoError::Duplicate("email".into()).into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        let err: AppError = ServiceError::from(RepoError::Validation("bad".into())).into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
