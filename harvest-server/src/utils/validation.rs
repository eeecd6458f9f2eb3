//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Lengths are counted in characters, not bytes.

use shared::error::AppError;
use shared::models::ProductInput;

use crate::orders::money;

// ── Text length limits ──────────────────────────────────────────────

/// Product names
pub const MIN_PRODUCT_NAME_LEN: usize = 2;
pub const MAX_PRODUCT_NAME_LEN: usize = 100;

/// Person names (first/last)
pub const MIN_PERSON_NAME_LEN: usize = 2;
pub const MAX_PERSON_NAME_LEN: usize = 50;

/// Descriptions, notes
pub const MAX_NOTE_LEN: usize = 500;

/// Product icon (an emoji or two)
pub const MAX_ICON_LEN: usize = 10;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Delivery and account addresses
pub const MIN_ADDRESS_LEN: usize = 10;
pub const MAX_ADDRESS_LEN: usize = 500;

/// Phone numbers
pub const MIN_PHONE_LEN: usize = 7;
pub const MAX_PHONE_LEN: usize = 20;

/// Catalog price ceiling
pub const MAX_PRICE: f64 = 1_000_000.0;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string, once trimmed, is within `min..=max` characters.
pub fn validate_text_len(value: &str, field: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{field} must not be empty")).with_detail("field", field));
    }
    if len < min {
        return Err(AppError::validation(format!(
            "{field} is too short ({len} chars, min {min})"
        ))
        .with_detail("field", field));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{field} is too long ({len} chars, max {max})"
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Loose structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let invalid = || AppError::validation("Invalid email address").with_detail("field", "email");

    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(invalid());
    };
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

/// Lower-case and trim an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digits plus `+ - ( ) .` and spaces, 7 to 20 characters
pub fn validate_phone(phone: &str) -> Result<(), AppError> {
    let phone = phone.trim();
    let len = phone.chars().count();
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' ');
    if !(MIN_PHONE_LEN..=MAX_PHONE_LEN).contains(&len)
        || !phone.chars().all(allowed)
        || !phone.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AppError::validation("Invalid phone number").with_detail("field", "phone"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .with_detail("field", "password"));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters"
        ))
        .with_detail("field", "password"));
    }
    Ok(())
}

/// Check a product payload and return it with trimmed text and a price
/// rounded to cents
pub fn normalize_product_input(input: &ProductInput) -> Result<ProductInput, AppError> {
    validate_text_len(&input.name, "name", MIN_PRODUCT_NAME_LEN, MAX_PRODUCT_NAME_LEN)?;
    if !input.price.is_finite() || input.price < 0.0 || input.price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "Price must be between 0 and {MAX_PRICE}, got {}",
            input.price
        ))
        .with_detail("field", "price"));
    }
    if input.stock < 0 {
        return Err(AppError::validation("Stock must be a non-negative number")
            .with_detail("field", "stock"));
    }

    let description = input
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned);
    validate_optional_text(&description, "description", MAX_NOTE_LEN)?;
    let icon = input.icon.as_deref().map(str::trim).map(str::to_owned);
    validate_optional_text(&icon, "icon", MAX_ICON_LEN)?;

    Ok(ProductInput {
        name: input.name.trim().to_owned(),
        category: input.category,
        price: money::to_f64(money::to_decimal(input.price)),
        description,
        icon,
        stock: input.stock,
    })
}
