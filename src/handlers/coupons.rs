use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, PaginatedResponse,
    PaginationParams,
};
use crate::{
    errors::ApiError,
    services::promotions::{CreateCouponInput, UpdateCouponInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use uuid::Uuid;

/// Admin coupon routes
pub fn admin_coupons_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_coupons))
        .route("/", post(create_coupon))
        .route("/:id", get(get_coupon))
        .route("/:id", put(update_coupon))
        .route("/:id", delete(delete_coupon))
}

/// List coupons
async fn list_coupons(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (coupons, total) = state
        .services
        .promotions
        .list_coupons(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        coupons,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get a coupon by id
async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupon = state
        .services
        .promotions
        .get_coupon(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(coupon))
}

/// Create a coupon
async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let created = state
        .services
        .promotions
        .create_coupon(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(created))
}

/// Update a coupon
async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let updated = state
        .services
        .promotions
        .update_coupon(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

/// Delete a coupon
async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .promotions
        .delete_coupon(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
