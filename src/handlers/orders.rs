use crate::handlers::common::{map_service_error, success_response, validate_input};
use crate::{
    auth::AuthSession,
    entities::OrderStatus,
    errors::ApiError,
    services::orders::OrderQuery,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Extension, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Customer order routes; every lookup is scoped to the session.
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_orders))
        .route("/:id", get(get_my_order))
}

/// Admin order routes
pub fn admin_orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin_list_orders))
        .route("/:id", get(admin_get_order))
        .route("/:id/status", put(update_order_status))
        .route("/:id/cancel", post(cancel_order))
}

/// List the authenticated customer's orders
async fn list_my_orders(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<OrderQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = state
        .services
        .orders
        .list_for_customer(session.customer_id, query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Get one of the authenticated customer's orders with items
async fn get_my_order(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get(id, Some(session.customer_id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

/// List all orders, optionally filtered by status
async fn admin_list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let page = state
        .services
        .orders
        .list_all(query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

/// Get any order with items
async fn admin_get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get(id, None)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

/// Move an order along the fulfillment transition graph
async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let updated = state
        .services
        .orders
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

/// Cancel an order, restocking its items
async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cancelled = state
        .services
        .orders
        .cancel(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cancelled))
}
