//! User API Handlers

use axum::{Json, extract::State, http::StatusCode};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, ProfileUpdate, RegisterRequest, Role,
    User, UserProfile,
};
use shared::util::now_millis;

use crate::auth::{CurrentUser, hash_password, verify_password};
use crate::db::repository::RepoError;
use crate::db::repository::user::{self as user_repo, NewUser};
use crate::security_log;
use crate::state::AppState;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_PERSON_NAME_LEN, MIN_PERSON_NAME_LEN, normalize_email,
    validate_email, validate_optional_text, validate_password, validate_phone, validate_text_len,
};

fn validate_name(value: &str, field: &str) -> Result<(), AppError> {
    validate_text_len(value, field, MIN_PERSON_NAME_LEN, MAX_PERSON_NAME_LEN)
}

/// Trimmed, blank-as-absent optional text
fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
}

fn issue_token(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let token = state
        .jwt
        .generate_for(&user)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_password(&req.password)?;
    validate_name(&req.first_name, "first_name")?;
    validate_name(&req.last_name, "last_name")?;
    let phone = clean_optional(&req.phone);
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    let address = clean_optional(&req.address);
    validate_optional_text(&address, "address", MAX_ADDRESS_LEN)?;

    let new_user = NewUser {
        email,
        password_hash: hash(&req.password)?,
        first_name: req.first_name.trim().to_owned(),
        last_name: req.last_name.trim().to_owned(),
        phone,
        address,
        role: Role::Customer,
    };

    let user = match user_repo::create(state.pool(), &new_user, now_millis()).await {
        Ok(user) => user,
        Err(RepoError::Duplicate(_)) => {
            return Err(AppError::new(ErrorCode::EmailAlreadyRegistered));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, email = %user.email, "User registered");
    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

/// POST /api/users/login
///
/// Answers after a fixed delay with one error for unknown email and wrong
/// password alike.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&req.email);
    let user = user_repo::find_by_email(state.pool(), &email).await?;

    tokio::time::sleep(state.login_delay).await;

    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        found => {
            security_log!(
                "WARN",
                "login_failed",
                email = email.clone(),
                reason = if found.is_some() { "invalid_password" } else { "unknown_email" }
            );
            return Err(AppError::invalid_credentials());
        }
    };

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");
    Ok(Json(issue_token(&state, user)?))
}

async fn load_user(state: &AppState, id: i64) -> Result<User, AppError> {
    user_repo::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))
}

/// GET /api/users/profile
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(load_user(&state, current.id).await?.into()))
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<Json<UserProfile>> {
    if let Some(first) = &req.first_name {
        validate_name(first, "first_name")?;
    }
    if let Some(last) = &req.last_name {
        validate_name(last, "last_name")?;
    }
    // A blank phone or address clears the stored value
    if let Some(phone) = clean_optional(&req.phone) {
        validate_phone(&phone)?;
    }
    validate_optional_text(&clean_optional(&req.address), "address", MAX_ADDRESS_LEN)?;

    let user = match user_repo::update_profile(state.pool(), current.id, &req, now_millis()).await {
        Ok(user) => user,
        Err(RepoError::NotFound(_)) => return Err(AppError::new(ErrorCode::UserNotFound)),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = user.id, "Profile updated");
    Ok(Json(user.into()))
}

/// POST /api/users/change-password
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<bool>> {
    let user = load_user(&state, current.id).await?;
    if !verify_password(&req.current_password, &user.password_hash) {
        security_log!("WARN", "password_change_rejected", user_id = user.id);
        return Err(AppError::invalid_credentials());
    }
    validate_password(&req.new_password)?;

    user_repo::update_password(state.pool(), user.id, &hash(&req.new_password)?, now_millis())
        .await?;
    security_log!("INFO", "password_changed", user_id = user.id);
    Ok(Json(true))
}
