use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::catalog::{CreateProductInput, CreateVariantInput, ProductQuery, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Public catalog routes
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:slug", get(get_product_by_slug))
}

/// Admin catalog routes
pub fn admin_products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_products))
        .route("/", post(create_product))
        .route("/:id", get(admin_get_product))
        .route("/:id", put(update_product))
        .route("/:id", delete(delete_product))
        .route("/:id/archive", post(archive_product))
        .route("/:id/stock", post(adjust_stock))
        .route("/:id/variants", post(add_variant))
        .route("/:id/variants/:variant_id", delete(remove_variant))
}

/// List active products with filters, search and sorting
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = state
        .services
        .products
        .list_public(query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Get an active product by slug
async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .products
        .get_by_slug(&slug)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// List products in any status
async fn admin_list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = state
        .services
        .products
        .list(query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Get a product by id in any status
async fn admin_get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .products
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// Create a product
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .products
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

/// Update a product
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .products
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

/// Archive a product
async fn archive_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let archived = state
        .services
        .products
        .archive(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(archived))
}

/// Delete a product
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .products
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate)]
struct AdjustStockRequest {
    /// Signed adjustment; negative values cannot take stock below zero
    #[validate(range(min = -100000, max = 100000))]
    delta: i32,
}

/// Adjust product stock by a signed delta
async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .products
        .adjust_stock(id, payload.delta)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

/// Add a variant to a product
async fn add_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateVariantInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .products
        .add_variant(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

/// Remove a variant from a product
async fn remove_variant(
    State(state): State<AppState>,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .products
        .remove_variant(id, variant_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
