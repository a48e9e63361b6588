//! Payment provider webhook.

use crate::{
    api::{
        AppState,
        extract::ApiJson,
        response::{ApiResult, ok_with_message},
    },
    core::payment::{self, EventReceipt, PaymentEvent},
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use subtle::ConstantTimeEq;

/// Header carrying the shared webhook secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

fn check_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    let expected = expected.ok_or_else(|| Error::forbidden("payment webhook is not configured"))?;
    let matches = headers
        .get(WEBHOOK_SECRET_HEADER)
        .is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(expected.as_bytes())));
    if !matches {
        return Err(Error::Unauthenticated {
            message: "invalid webhook secret".to_string(),
        });
    }
    Ok(())
}

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(event): ApiJson<PaymentEvent>,
) -> ApiResult<EventReceipt> {
    check_secret(&headers, state.config.payments.webhook_secret.as_deref())?;
    let receipt = payment::apply_payment_event(&state.db, event).await?;
    let message = if receipt.changed {
        "Payment event applied"
    } else {
        "Payment event already applied"
    };
    ok_with_message(receipt, message)
}

/// `/api/payments` routes
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook))
}
