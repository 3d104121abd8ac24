use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::carts::{AddToCartInput, CreateCartInput, ReconcileCartInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Cart routes. Carts are reachable by id without authentication so
/// guest checkout works; ids are unguessable v4 UUIDs.
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/reconcile", post(reconcile_cart))
        .route("/:id", get(get_cart))
        .route("/:id/items", post(add_to_cart))
        .route("/:id/items/:item_id", put(update_cart_item))
        .route("/:id/items/:item_id", delete(remove_cart_item))
        .route("/:id/clear", post(clear_cart))
        .route("/:id/coupon", post(apply_coupon))
        .route("/:id/coupon", delete(remove_coupon))
}

/// Create a new cart
async fn create_cart(
    State(state): State<AppState>,
    Json(payload): Json<CreateCartInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .create_cart(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(cart))
}

/// Get cart with items
async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart_with_items = state
        .services
        .carts
        .get_cart(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart_with_items))
}

#[derive(Debug, Deserialize, Validate)]
struct AddItemRequest {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    #[validate(range(min = 1))]
    quantity: i32,
    selected_options: Option<serde_json::Value>,
}

/// Add item to cart
async fn add_to_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = AddToCartInput {
        product_id: payload.product_id,
        variant_id: payload.variant_id,
        quantity: payload.quantity,
        selected_options: payload.selected_options,
    };

    let cart = state
        .services
        .carts
        .add_item(cart_id, input)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateQuantityRequest {
    /// Zero removes the line
    #[validate(range(min = 0))]
    quantity: i32,
}

/// Update cart item quantity
async fn update_cart_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .carts
        .update_item_quantity(cart_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

/// Remove item from cart
async fn remove_cart_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .carts
        .remove_item(cart_id, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Clear all items from cart
async fn clear_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .carts
        .clear_cart(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[derive(Debug, Deserialize, Validate)]
struct ApplyCouponRequest {
    #[validate(length(min = 1, max = 64))]
    code: String,
}

/// Apply a coupon code to the cart
async fn apply_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let result = state
        .services
        .carts
        .apply_coupon(id, &payload.code)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

/// Remove the applied coupon from the cart
async fn remove_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let result = state
        .services
        .carts
        .remove_coupon(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

/// Rebuild a server cart from client-persisted lines, dropping or
/// adjusting anything the catalog no longer supports
async fn reconcile_cart(
    State(state): State<AppState>,
    Json(payload): Json<ReconcileCartInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let result = state
        .services
        .carts
        .reconcile(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}
