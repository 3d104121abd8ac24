use crate::{config::AppConfig, errors::ServiceError};
use axum::http::HeaderMap;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Thin client for the external payment processor.
///
/// The processor is a collaborator, not part of this system: we create
/// payment intents at checkout and receive status updates through its
/// signed webhook. Processor-side rejections surface as `PaymentFailed`
/// (HTTP 402); transport problems as `ExternalServiceError` (502).
#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PaymentGateway {
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.payment_api_url.trim_end_matches('/').to_string(),
            api_key: config.payment_api_key.clone(),
        })
    }

    /// Create a payment intent for an order's total.
    #[instrument(skip(self))]
    pub async fn create_payment_intent(
        &self,
        order_number: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        // Without an API key the processor is simulated so local
        // development works offline.
        let Some(ref key) = self.api_key else {
            let intent = PaymentIntent {
                id: format!("pi_sim_{}", uuid::Uuid::new_v4().simple()),
                status: "requires_confirmation".to_string(),
                client_secret: None,
            };
            warn!(order_number, intent_id = %intent.id, "payment_api_key not set; simulating payment intent");
            return Ok(intent);
        };

        let request = CreatePaymentIntentRequest {
            amount,
            currency: currency.to_string(),
            reference: order_number.to_string(),
        };

        let builder = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .json(&request)
            .bearer_auth(key);

        let response = builder.send().await.map_err(|e| {
            error!(order_number, error = %e, "payment processor unreachable");
            ServiceError::ExternalServiceError("Payment processor unreachable".to_string())
        })?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            warn!(order_number, %status, detail, "payment intent rejected");
            return Err(ServiceError::PaymentFailed(format!(
                "Payment was declined for order {}",
                order_number
            )));
        }
        if !status.is_success() {
            error!(order_number, %status, "payment processor error");
            return Err(ServiceError::ExternalServiceError(
                "Payment processor error".to_string(),
            ));
        }

        response.json::<PaymentIntent>().await.map_err(|e| {
            error!(order_number, error = %e, "malformed payment intent response");
            ServiceError::ExternalServiceError("Malformed payment processor response".to_string())
        })
    }
}

#[derive(Debug, Serialize)]
struct CreatePaymentIntentRequest {
    amount: Decimal,
    currency: String,
    reference: String,
}

/// Payment intent returned by the processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub client_secret: Option<String>,
}

/// Webhook event envelope sent by the processor
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub payment_intent_id: String,
}

/// Verify the processor's webhook signature.
///
/// The signature is HMAC-SHA256 over `"{timestamp}.{body}"`, hex
/// encoded, carried in `x-signature` with the unix timestamp in
/// `x-timestamp`. Timestamps outside the tolerance window are rejected
/// to blunt replay.
pub fn verify_webhook_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> bool {
    let (Some(ts), Some(sig)) = (headers.get("x-timestamp"), headers.get("x-signature")) else {
        return false;
    };
    let (Ok(ts), Ok(sig)) = (ts.to_str(), sig.to_str()) else {
        return false;
    };

    let Ok(ts_i) = ts.parse::<i64>() else {
        return false;
    };
    let now = Utc::now().timestamp();
    if (now - ts_i).unsigned_abs() > tolerance_secs {
        return false;
    }

    let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap_or(""));
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(signed.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());
    constant_time_eq(&expected, sig)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn sign(ts: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{}.{}", ts, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn headers_for(ts: i64, sig: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-timestamp", ts.to_string().parse().unwrap());
        headers.insert("x-signature", sig.parse().unwrap());
        headers
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = r#"{"type":"payment_intent.succeeded"}"#;
        let ts = Utc::now().timestamp();
        let headers = headers_for(ts, &sign(ts, body));
        assert!(verify_webhook_signature(
            &headers,
            &Bytes::from(body),
            SECRET,
            300
        ));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let ts = Utc::now().timestamp();
        let headers = headers_for(ts, &sign(ts, r#"{"amount":10}"#));
        assert!(!verify_webhook_signature(
            &headers,
            &Bytes::from(r#"{"amount":9999}"#),
            SECRET,
            300
        ));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = "{}";
        let ts = Utc::now().timestamp() - 3600;
        let headers = headers_for(ts, &sign(ts, body));
        assert!(!verify_webhook_signature(
            &headers,
            &Bytes::from(body),
            SECRET,
            300
        ));
    }

    #[test]
    fn missing_headers_are_rejected() {
        assert!(!verify_webhook_signature(
            &HeaderMap::new(),
            &Bytes::from("{}"),
            SECRET,
            300
        ));
    }

    #[test]
    fn webhook_event_deserializes() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"payment_intent_id":"pi_42"}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.payment_intent_id, "pi_42");
    }
}
