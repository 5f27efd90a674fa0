// --- File: crates/perdue_stripe/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use serde_json::json;
use utoipa::OpenApi;

use crate::handlers::ErrorResponse;
use crate::logic::{
    CreateCheckoutSessionResponse, ReservationRequest, StripeCheckoutSessionObject,
    StripeCustomerDetails, StripeEvent, StripeEventData,
};

#[utoipa::path(
    post,
    path = "/create-checkout-session", // Path relative to /api
    request_body(content = ReservationRequest, example = json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "date": "2026-09-05",
        "time": "20:30",
        "partySize": 2,
        "celebration": "anniversary"
    })),
    responses(
        (status = 200, description = "Checkout session created; redirect the browser to `url`", body = CreateCheckoutSessionResponse),
        (status = 400, description = "Invalid JSON, missing fields, or a business-rule rejection", body = ErrorResponse),
        (status = 405, description = "Method not allowed", body = ErrorResponse),
        (status = 500, description = "Internal Server Error or Stripe API error", body = ErrorResponse)
    ),
    tag = "Reservations"
)]
fn doc_create_checkout_session_handler() {}

#[utoipa::path(
    post,
    path = "/stripe/webhook", // Path relative to /api
    request_body = StripeEvent,
    responses(
        (status = 200, description = "Webhook received and acknowledged"),
        (status = 400, description = "Signature verification failed or bad payload"),
        (status = 500, description = "Internal Server Error processing webhook")
    ),
    tag = "Stripe Webhooks"
)]
fn doc_stripe_webhook_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(doc_create_checkout_session_handler, doc_stripe_webhook_handler),
    components(schemas(
        ReservationRequest,
        CreateCheckoutSessionResponse,
        ErrorResponse,
        StripeEvent,
        StripeEventData,
        StripeCheckoutSessionObject,
        StripeCustomerDetails,
    ))
)]
pub struct StripeApiDoc;
