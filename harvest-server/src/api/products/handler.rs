//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Availability, Category, Product, ProductInput, ProductQuery, StockUpdate};
use shared::util::now_millis;

use crate::auth::CurrentUser;
use crate::db::repository::product as product_repo;
use crate::state::AppState;
use crate::utils::validation::normalize_product_input;

fn product_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::ProductNotFound, format!("Product {id} not found"))
}

fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.parse()
        .map_err(|e: String| AppError::with_message(ErrorCode::InvalidCategory, e))
}

/// `None`, empty, `all` and the storefront's legacy `tous` disable the filter
fn category_filter(raw: Option<&str>) -> Result<Option<Category>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") | Some("tous") => Ok(None),
        Some(c) => parse_category(c).map(Some),
    }
}

fn availability_filter(raw: Option<&str>) -> Result<Option<Availability>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(a) => a.parse().map(Some).map_err(AppError::validation),
    }
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let category = category_filter(query.category.as_deref())?;
    let availability = availability_filter(query.availability.as_deref())?;
    let products = product_repo::find_all(state.pool(), category, availability).await?;
    Ok(Json(products))
}

/// GET /api/products/category/{category}
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<Vec<Product>>> {
    let category = parse_category(&category)?;
    let products = product_repo::find_all(state.pool(), Some(category), None).await?;
    Ok(Json(products))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Product>> {
    let product = product_repo::find_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    Ok(Json(product))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let input = normalize_product_input(&payload)?;
    let product = product_repo::create(state.pool(), &input, now_millis()).await?;
    tracing::info!(product_id = product.id, admin_id = user.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    let input = normalize_product_input(&payload)?;
    let product = product_repo::replace(state.pool(), id, &input, now_millis())
        .await?
        .ok_or_else(|| product_not_found(id))?;
    tracing::info!(product_id = id, admin_id = user.id, "Product updated");
    Ok(Json(product))
}

/// PATCH /api/products/{id}/stock
pub async fn update_stock(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<StockUpdate>,
) -> AppResult<Json<Product>> {
    let product = product_repo::set_stock(state.pool(), id, payload.stock, now_millis())
        .await?
        .ok_or_else(|| product_not_found(id))?;
    tracing::info!(
        product_id = id,
        admin_id = user.id,
        stock = product.stock,
        availability = %product.availability,
        "Stock updated"
    );
    Ok(Json(product))
}

/// DELETE /api/products/{id}
///
/// Order lines referencing the product go with it; order totals are kept.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    if !product_repo::delete(state.pool(), id).await? {
        return Err(product_not_found(id));
    }
    tracing::info!(product_id = id, admin_id = user.id, "Product deleted");
    Ok(Json(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters() {
        assert_eq!(category_filter(Some("all")).unwrap(), None);
        assert_eq!(category_filter(Some("tous")).unwrap(), None);
        assert_eq!(category_filter(None).unwrap(), None);
        assert_eq!(category_filter(Some("herbes")).unwrap(), Some(Category::Herb));
        assert_eq!(
            category_filter(Some("meat")).unwrap_err().code,
            ErrorCode::InvalidCategory
        );
        assert_eq!(
            availability_filter(Some("out-of-stock")).unwrap(),
            Some(Availability::OutOfStock)
        );
        assert!(availability_filter(Some("plenty")).is_err());
    }
}
