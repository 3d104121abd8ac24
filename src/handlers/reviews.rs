use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthSession,
    errors::ApiError,
    services::reviews::{ReviewQuery, SubmitReviewInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post},
    Extension, Router,
};
use uuid::Uuid;

/// Public review routes
pub fn reviews_routes() -> Router<AppState> {
    Router::new().route("/product/:product_id", get(list_product_reviews))
}

/// Authenticated customer review routes
pub fn customer_reviews_routes() -> Router<AppState> {
    Router::new().route("/", post(submit_review))
}

/// Admin review moderation routes
pub fn admin_reviews_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_reviews))
        .route("/:id/approve", post(approve_review))
        .route("/:id", delete(delete_review))
}

/// Approved reviews for a product with the aggregate rating
pub async fn list_product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ReviewQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let reviews = state
        .services
        .reviews
        .list_for_product(product_id, query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(reviews))
}

/// Submit a review; one per customer per product
async fn submit_review(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(payload): Json<SubmitReviewInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let created = state
        .services
        .reviews
        .submit(session.customer_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

/// Moderation queue, filterable by approval state
async fn admin_list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let reviews = state
        .services
        .reviews
        .list_all(query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(reviews))
}

/// Approve a review for the storefront
async fn approve_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let approved = state
        .services
        .reviews
        .approve(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(approved))
}

/// Delete a review
async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .reviews
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
