// --- File: crates/perdue_stripe/src/logic.rs ---
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc, Weekday};
use hmac::{Hmac, Mac};
use perdue_config::{ReservationConfig, StripeConfig};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{error, info};

use crate::error::{ReservationError, StripeError};

// Import the HTTP client from perdue_common
use perdue_common::{ReservationLedger, HTTP_CLIENT};

// Conditionally import ToSchema if openapi feature is enabled
#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- Data Structures ---

/// Request from the reservation form to create a Stripe Checkout Session.
///
/// Every field is optional at the wire level; presence is checked during
/// validation so that a missing field yields the documented error body
/// instead of a deserialization failure.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ReservationRequest {
    #[cfg_attr(feature = "openapi", schema(example = "Ada Lovelace"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "ada@example.com"))]
    pub email: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "2026-09-05"))]
    pub date: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = "20:30"))]
    pub time: Option<String>,
    /// Accepts a number or a numeric string, mirroring what the form sends.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>, example = 2))]
    pub party_size: Option<Value>,
    #[cfg_attr(feature = "openapi", schema(example = "anniversary"))]
    pub celebration: Option<String>,
}

/// A reservation request that has passed every business rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub name: String,
    pub email: String,
    /// Original `YYYY-MM-DD` string, round-tripped into session metadata.
    pub date: String,
    pub time: String,
    pub party_size: i64,
    pub celebration: String,
}

/// Response to the frontend: the Stripe-hosted payment page to redirect to.
#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateCheckoutSessionResponse {
    #[cfg_attr(
        feature = "openapi",
        schema(example = "https://checkout.stripe.com/pay/cs_test_a1...")
    )]
    pub url: String,
}

// --- Validation ---

fn present_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Presence check matching the original form contract: absent fields, empty
/// strings and a zero party size all count as missing.
fn party_size_present(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

/// Coerces the wire party size (number or numeric string) to an integer.
fn coerce_party_size(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_allowed_date(date: &str, allowed_days: &[Weekday]) -> Result<(), ReservationError> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ReservationError::DisallowedDate)?;
    if allowed_days.contains(&parsed.weekday()) {
        Ok(())
    } else {
        Err(ReservationError::DisallowedDate)
    }
}

/// Validates a reservation request against the business rules.
///
/// The weekday check works on the submitted calendar date itself, so the
/// result never depends on the server clock or timezone.
pub fn validate_reservation(
    request: &ReservationRequest,
    rules: &ReservationConfig,
) -> Result<Reservation, ReservationError> {
    let name = present_text(&request.name);
    let email = present_text(&request.email);
    let date = present_text(&request.date);
    let time = present_text(&request.time);

    if name.is_none()
        || email.is_none()
        || date.is_none()
        || time.is_none()
        || !party_size_present(&request.party_size)
    {
        return Err(ReservationError::MissingFields);
    }
    let (name, email, date, time) = (
        name.unwrap_or_default(),
        email.unwrap_or_default(),
        date.unwrap_or_default(),
        time.unwrap_or_default(),
    );

    let party_size = request
        .party_size
        .as_ref()
        .and_then(coerce_party_size)
        .ok_or(ReservationError::PartySize)?;
    if party_size != rules.party_size {
        return Err(ReservationError::PartySize);
    }

    // allowed_days was validated at config construction; an unparseable entry
    // here means the config was mutated after startup, so fail closed.
    let allowed_days = rules
        .allowed_weekdays()
        .map_err(|_| ReservationError::DisallowedDate)?;
    parse_allowed_date(date, &allowed_days)?;

    if !rules.allowed_times.iter().any(|t| t == time) {
        return Err(ReservationError::DisallowedTime);
    }

    Ok(Reservation {
        name: name.to_string(),
        email: email.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        party_size,
        celebration: request.celebration.clone().unwrap_or_default(),
    })
}

// --- Checkout Session Creation ---

#[allow(dead_code)]
#[derive(Deserialize, Debug)]
struct StripeCheckoutSessionApiResponse {
    // Used for session creation response
    pub id: String,
    pub url: Option<String>,
}

/// Creates a Stripe Checkout Session for a validated reservation.
///
/// The reservation fields ride along as session metadata and come back
/// unchanged in the completion webhook.
pub async fn create_checkout_session(
    stripe_config: &StripeConfig,
    reservation: &Reservation,
) -> Result<CreateCheckoutSessionResponse, StripeError> {
    let secret_key = stripe_config
        .secret_key
        .as_deref()
        .ok_or(StripeError::ConfigError)?;

    let currency = stripe_config
        .currency
        .clone()
        .unwrap_or_else(|| "usd".to_string())
        .to_lowercase();
    let unit_amount = stripe_config.unit_amount.unwrap_or(5000);
    let product_name = stripe_config
        .product_name
        .clone()
        .unwrap_or_else(|| "Reservation Deposit".to_string());
    let product_description = stripe_config
        .product_description
        .clone()
        .unwrap_or_else(|| format!("per due (x{} guests)", reservation.party_size));

    let form_body: Vec<(String, String)> = vec![
        ("payment_method_types[]".to_string(), "card".to_string()),
        ("mode".to_string(), "payment".to_string()),
        ("customer_email".to_string(), reservation.email.clone()),
        ("success_url".to_string(), stripe_config.success_url.clone()),
        ("cancel_url".to_string(), stripe_config.cancel_url.clone()),
        ("line_items[0][price_data][currency]".to_string(), currency),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            product_name,
        ),
        (
            "line_items[0][price_data][product_data][description]".to_string(),
            product_description,
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            unit_amount.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("metadata[name]".to_string(), reservation.name.clone()),
        ("metadata[date]".to_string(), reservation.date.clone()),
        ("metadata[time]".to_string(), reservation.time.clone()),
        (
            "metadata[partySize]".to_string(),
            reservation.party_size.to_string(),
        ),
        (
            "metadata[celebration]".to_string(),
            reservation.celebration.clone(),
        ),
    ];

    let api_url = format!("{}/v1/checkout/sessions", stripe_config.api_base());
    info!("[Stripe Logic] Creating checkout session for {}", reservation.date);

    let response = HTTP_CLIENT
        .post(&api_url)
        .basic_auth(secret_key, None::<&str>)
        .form(&form_body)
        .send()
        .await?;

    let status = response.status();
    let body_text = response.text().await?;

    if status.is_success() {
        let stripe_response: StripeCheckoutSessionApiResponse = serde_json::from_str(&body_text)?;
        if let Some(url) = stripe_response.url {
            info!(
                "[Stripe Logic] Checkout session {} created",
                stripe_response.id
            );
            Ok(CreateCheckoutSessionResponse { url })
        } else {
            error!(
                "[Stripe Logic] Stripe response missing checkout session URL: {}",
                body_text
            );
            Err(StripeError::InternalError(
                "Stripe response missing checkout URL".to_string(),
            ))
        }
    } else {
        let error_message = match serde_json::from_str::<Value>(&body_text) {
            Ok(json_body) => json_body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or(&body_text)
                .to_string(),
            Err(_) => body_text,
        };
        error!(
            "[Stripe Logic] Stripe API request failed with HTTP status: {}. Message: {}",
            status, error_message
        );
        Err(StripeError::ApiError {
            status_code: status.as_u16(),
            message: error_message,
        })
    }
}

// --- Webhook Event Structures ---

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeEventData {
    /// The actual object related to the event. serde_json::Value because the
    /// structure of 'object' varies by event type.
    pub object: Value,
}

/// Represents the outer Stripe Event object.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeEvent {
    pub id: String,
    pub api_version: Option<String>,
    pub created: i64, // Unix timestamp
    pub livemode: bool,
    #[serde(rename = "type")]
    pub event_type: String, // e.g., "checkout.session.completed"
    pub data: StripeEventData,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// The `data.object` of a "checkout.session.completed" event, reduced to the
/// fields the ledger row needs.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StripeCheckoutSessionObject {
    pub id: String,                // Checkout Session ID (cs_...)
    pub amount_total: Option<i64>, // Total amount in minor units
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    pub metadata: Option<HashMap<String, String>>, // Metadata set at creation
    pub payment_intent: Option<String>,            // Payment Intent ID (pi_...)
    pub payment_status: Option<String>, // e.g., "paid", "unpaid", "no_payment_required"
}

// --- Webhook Processing Logic ---

/// Verifies the signature of an incoming Stripe webhook request.
///
/// The HMAC is computed over the exact raw payload bytes; the payload must
/// never be re-serialized before verification.
///
/// # Arguments
/// * `payload_bytes` - The raw request body bytes.
/// * `sig_header` - The value of the 'Stripe-Signature' header.
/// * `secret` - The webhook signing secret (whsec_...).
pub fn verify_stripe_signature(
    payload_bytes: &[u8],
    sig_header: Option<&str>,
    secret: &str,
) -> Result<(), StripeError> {
    let sig_header_value = sig_header.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string())
    })?;

    let mut timestamp_str: Option<&str> = None;
    let mut v1_signatures_hex: Vec<&str> = Vec::new();

    for item in sig_header_value.split(',') {
        let parts: Vec<&str> = item.trim().splitn(2, '=').collect();
        if parts.len() == 2 {
            match parts[0] {
                "t" => timestamp_str = Some(parts[1]),
                "v1" => v1_signatures_hex.push(parts[1]),
                _ => {} // Ignore other parts like v0
            }
        }
    }

    let timestamp_str = timestamp_str.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp 't' in Stripe-Signature".to_string())
    })?;
    let parsed_timestamp = timestamp_str.parse::<i64>().map_err(|_| {
        StripeError::WebhookSignatureError("Invalid timestamp format in Stripe-Signature".to_string())
    })?;

    if v1_signatures_hex.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "Missing v1 signature in Stripe-Signature".to_string(),
        ));
    }

    // Replay protection: reject timestamps outside the tolerance window.
    let current_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64;
    const TOLERANCE_SECONDS: i64 = 600;
    if (current_timestamp - parsed_timestamp).abs() > TOLERANCE_SECONDS {
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    // Signed payload is `{timestamp}.{raw body}`, fed to the MAC as bytes so
    // non-UTF-8 payloads verify byte-for-byte.
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(timestamp_str.as_bytes());
    mac.update(b".");
    mac.update(payload_bytes);
    let calculated_signature_hex = hex::encode(mac.finalize().into_bytes());

    for provided_sig_hex in v1_signatures_hex {
        if constant_time_eq(
            calculated_signature_hex.as_bytes(),
            provided_sig_hex.as_bytes(),
        ) {
            return Ok(());
        }
    }
    Err(StripeError::WebhookSignatureError(
        "Signature mismatch".to_string(),
    ))
}

/// Helper for constant-time string comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Converts a minor-unit amount to decimal currency units: 5000 -> 50,
/// 5150 -> 51.5.
pub fn amount_to_decimal(minor_units: i64) -> Value {
    if minor_units % 100 == 0 {
        json!(minor_units / 100)
    } else {
        json!(minor_units as f64 / 100.0)
    }
}

/// Builds the canonical ledger row for a completed checkout session.
///
/// Field order is the wire contract with the spreadsheet consumer:
/// [timestamp, name, email, date, time, partySize, celebration, amountTotal,
/// sessionId, paymentIntentId]
pub fn build_ledger_row(
    session: &StripeCheckoutSessionObject,
    recorded_at: DateTime<Utc>,
) -> Vec<Value> {
    let meta = |key: &str| -> Value {
        Value::String(
            session
                .metadata
                .as_ref()
                .and_then(|m| m.get(key))
                .cloned()
                .unwrap_or_default(),
        )
    };

    let email = session
        .customer_email
        .clone()
        .or_else(|| {
            session
                .customer_details
                .as_ref()
                .and_then(|d| d.email.clone())
        })
        .unwrap_or_default();

    let amount_total = match session.amount_total {
        Some(minor_units) => amount_to_decimal(minor_units),
        None => Value::String(String::new()),
    };

    vec![
        Value::String(recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        meta("name"),
        Value::String(email),
        meta("date"),
        meta("time"),
        meta("partySize"),
        meta("celebration"),
        amount_total,
        Value::String(session.id.clone()),
        Value::String(session.payment_intent.clone().unwrap_or_default()),
    ]
}

/// Processes a verified Stripe webhook event.
///
/// Only "checkout.session.completed" has side effects; every other verified
/// event type is acknowledged and ignored.
pub async fn process_stripe_webhook(
    event: StripeEvent,
    ledger: &dyn ReservationLedger,
) -> Result<(), StripeError> {
    info!("Processing Stripe event type: {}", event.event_type);

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSessionObject = serde_json::from_value(event.data.object)
                .map_err(|e| {
                    StripeError::WebhookProcessingError(format!(
                        "Failed to parse checkout session object: {}",
                        e
                    ))
                })?;

            info!(
                "Checkout session {} completed (payment status {:?}), appending ledger row",
                session.id, session.payment_status
            );
            let row = build_ledger_row(&session, Utc::now());
            ledger
                .append_row(row)
                .await
                .map_err(|e| StripeError::LedgerError(e.to_string()))?;
        }
        other => {
            info!("Received unhandled Stripe event type: {}", other);
        }
    }
    Ok(())
}
