// --- File: crates/perdue_stripe/src/handlers.rs ---
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use perdue_common::{HttpStatusCode, ReservationLedger};
use perdue_config::AppConfig;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{ReservationError, StripeError};
use crate::logic::{
    create_checkout_session, process_stripe_webhook, validate_reservation,
    CreateCheckoutSessionResponse, ReservationRequest, StripeEvent,
};

// --- State for Stripe Handlers ---
// Config plus the injected ledger; reqwest::Client is static in perdue_common.
#[derive(Clone)]
pub struct StripeState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<dyn ReservationLedger>,
}

/// JSON error body: `{"error": "..."}`.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn client_rejection(err: ReservationError) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Axum handler to validate a reservation request and create a Stripe
/// Checkout Session.
///
/// Takes the raw body rather than `Json<T>` so that malformed JSON yields
/// the documented `{"error": "Invalid JSON"}` response.
#[axum::debug_handler]
pub async fn create_checkout_session_handler(
    State(state): State<Arc<StripeState>>,
    body: Bytes,
) -> Result<Json<CreateCheckoutSessionResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.config.use_stripe {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Stripe service is disabled.",
        ));
    }
    let stripe_config = state.config.stripe.as_ref().ok_or_else(|| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stripe configuration not loaded.",
        )
    })?;

    let request: ReservationRequest = serde_json::from_slice(&body)
        .map_err(|_| client_rejection(ReservationError::InvalidJson))?;

    let reservation =
        validate_reservation(&request, &state.config.reservation).map_err(client_rejection)?;

    match create_checkout_session(stripe_config, &reservation).await {
        Ok(response) => Ok(Json(response)),
        Err(StripeError::ConfigError) => {
            error!("Stripe configuration error.");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Stripe configuration error on server.",
            ))
        }
        Err(StripeError::RequestError(e)) => {
            error!("Stripe Reqwest Error: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to communicate with payment provider.",
            ))
        }
        Err(StripeError::ParseError(e)) => {
            error!("Stripe Parse Error: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to understand payment provider response.",
            ))
        }
        Err(StripeError::ApiError {
            status_code,
            message,
        }) => {
            error!("Stripe API Error ({}): {}", status_code, message);
            Err(error_response(
                StatusCode::from_u16(status_code).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
            ))
        }
        Err(e) => {
            error!("Stripe checkout session error: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    }
}

/// Fallback for the checkout route: anything other than POST (and the CORS
/// preflight) is rejected with the documented 405 body.
pub async fn method_not_allowed_handler() -> (StatusCode, Json<ErrorResponse>) {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Bare OPTIONS success; actual preflight requests are answered by the CORS
/// layer before they reach this handler.
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

/// Axum handler for the Stripe webhook.
///
/// The body is taken as raw bytes: the signature is computed over the exact
/// payload Stripe sent, so nothing may be parsed or re-serialized before
/// verification succeeds.
#[axum::debug_handler]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<StripeState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.config.use_stripe {
        return (StatusCode::SERVICE_UNAVAILABLE, "Stripe service disabled.").into_response();
    }

    let webhook_secret = match state
        .config
        .stripe
        .as_ref()
        .and_then(|s| s.webhook_secret.as_deref())
    {
        Some(s) => s,
        None => {
            error!("Stripe webhook secret not configured!");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let sig_header = headers.get("Stripe-Signature").and_then(|h| h.to_str().ok());

    if let Err(e) = crate::logic::verify_stripe_signature(&body, sig_header, webhook_secret) {
        warn!("Stripe webhook signature verification failed: {}", e);
        return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e)).into_response();
    }

    // Deserialize the raw body into StripeEvent AFTER signature verification
    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("Failed to deserialize Stripe webhook event: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Webhook Error: {}", e)).into_response();
        }
    };

    match process_stripe_webhook(event, state.ledger.as_ref()).await {
        Ok(()) => {
            info!("Stripe webhook processed successfully.");
            Json(json!({ "received": true })).into_response()
        }
        Err(e) => {
            error!("Error processing Stripe webhook: {}", e);
            // Non-2xx so Stripe redelivers the event later
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Webhook processing error: {}", e),
            )
                .into_response()
        }
    }
}
