use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthSession,
    errors::ApiError,
    services::wishlists::{CreateWishlistInput, UpdateWishlistInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Extension, Router,
};
use uuid::Uuid;

/// Wishlist routes; all scoped to the authenticated customer.
pub fn wishlists_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlists))
        .route("/", post(create_wishlist))
        .route("/:id", get(get_wishlist))
        .route("/:id", put(update_wishlist))
        .route("/:id", delete(delete_wishlist))
        .route("/:id/products/:product_id", post(add_product))
        .route("/:id/products/:product_id", delete(remove_product))
}

/// List the customer's wishlists
async fn list_wishlists(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let wishlists = state
        .services
        .wishlists
        .list(session.customer_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(wishlists))
}

/// Get a wishlist with its products resolved
async fn get_wishlist(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let wishlist = state
        .services
        .wishlists
        .get(session.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(wishlist))
}

/// Create a wishlist
async fn create_wishlist(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(payload): Json<CreateWishlistInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .wishlists
        .create(session.customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

/// Rename a wishlist or toggle its visibility
async fn update_wishlist(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWishlistInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .wishlists
        .update(session.customer_id, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

/// Delete a wishlist and its entries
async fn delete_wishlist(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .wishlists
        .delete(session.customer_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Add a product to a wishlist
async fn add_product(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .wishlists
        .add_product(session.customer_id, id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Remove a product from a wishlist
async fn remove_product(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .wishlists
        .remove_product(session.customer_id, id, product_id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
