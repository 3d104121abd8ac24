use crate::handlers::common::{created_response, map_service_error};
use crate::{auth::AuthSession, errors::ApiError, services::checkout::CheckoutInput, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Extension, Router,
};
use serde::Deserialize;
use uuid::Uuid;

/// Checkout routes; authentication is layered on where these are mounted.
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    cart_id: Uuid,
    shipping_address: Option<serde_json::Value>,
}

/// Convert a cart into an order and open a payment intent
async fn checkout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let input = CheckoutInput {
        cart_id: payload.cart_id,
        customer_id: session.customer_id,
        shipping_address: payload.shipping_address,
    };

    let outcome = state
        .services
        .checkout
        .checkout(input)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(outcome))
}
