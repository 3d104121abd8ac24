use crate::{
    errors::ServiceError,
    services::payments::{verify_webhook_signature, WebhookEvent},
    AppState,
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use tracing::{info, warn};

/// POST /api/v1/payments/webhook
///
/// Entry point for the payment processor's status callbacks. The body
/// is taken raw so the signature covers exactly the bytes sent.
/// Unrecognized event types are acknowledged and ignored so the
/// processor does not retry them forever.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted"),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(ref secret) = state.config.payment_webhook_secret {
        let ok = verify_webhook_signature(
            &headers,
            &body,
            secret,
            state.config.payment_webhook_tolerance_secs,
        );
        if !ok {
            warn!("payment webhook signature verification failed");
            return Err(ServiceError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            state
                .services
                .orders
                .mark_paid_by_intent(&event.data.payment_intent_id)
                .await?;
        }
        "payment_intent.payment_failed" => {
            state
                .services
                .orders
                .mark_payment_failed_by_intent(&event.data.payment_intent_id)
                .await?;
        }
        other => {
            info!(event_type = other, "ignoring unhandled payment webhook type");
        }
    }

    Ok((StatusCode::OK, "ok"))
}
