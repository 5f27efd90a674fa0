// --- File: crates/perdue_stripe/src/error.rs ---
use perdue_common::{external_service_error, HttpStatusCode, PerdueError};
use thiserror::Error;

/// Client-input rejections for the reservation checkout endpoint.
///
/// The Display strings are the wire contract: they are returned verbatim in
/// the `{"error": ...}` response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Party size must be 2")]
    PartySize,

    #[error("Date must be Fri, Sat, or Sun")]
    DisallowedDate,

    #[error("Time must be 18:30 or 20:30")]
    DisallowedTime,
}

impl HttpStatusCode for ReservationError {
    fn status_code(&self) -> u16 {
        400
    }
}

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Error occurred during a Stripe API request
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    /// Error parsing Stripe API response
    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or incomplete Stripe configuration
    #[error("Stripe configuration missing or incomplete")]
    ConfigError,

    /// Webhook signature verification failed
    #[error("{0}")]
    WebhookSignatureError(String),

    /// Webhook event processing error
    #[error("Stripe webhook event processing error: {0}")]
    WebhookProcessingError(String),

    /// Ledger append failed after a verified webhook
    #[error("Ledger append failed: {0}")]
    LedgerError(String),

    /// Internal processing error
    #[error("Internal processing error: {0}")]
    InternalError(String),
}

/// Convert StripeError to PerdueError
impl From<StripeError> for PerdueError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::RequestError(e) => {
                PerdueError::HttpError(format!("Stripe request error: {}", e))
            }
            StripeError::ApiError {
                status_code,
                message,
            } => external_service_error(
                "Stripe API",
                format!("Status: {}, Message: {}", status_code, message),
            ),
            StripeError::ParseError(e) => {
                PerdueError::ParseError(format!("Stripe response parse error: {}", e))
            }
            StripeError::ConfigError => {
                PerdueError::ConfigError("Stripe configuration missing or incomplete".to_string())
            }
            StripeError::WebhookSignatureError(msg) => {
                PerdueError::AuthError(format!("Stripe webhook signature error: {}", msg))
            }
            StripeError::WebhookProcessingError(msg) => {
                external_service_error("Stripe webhook", msg)
            }
            StripeError::LedgerError(msg) => external_service_error("Reservation ledger", msg),
            StripeError::InternalError(msg) => {
                PerdueError::InternalError(format!("Stripe internal error: {}", msg))
            }
        }
    }
}

/// Implement HttpStatusCode for StripeError to provide a consistent way to
/// convert StripeError to HTTP status codes.
impl HttpStatusCode for StripeError {
    fn status_code(&self) -> u16 {
        match self {
            StripeError::RequestError(_) => 500,
            StripeError::ApiError { status_code, .. } => *status_code,
            StripeError::ParseError(_) => 500,
            StripeError::ConfigError => 500,
            StripeError::WebhookSignatureError(_) => 400,
            StripeError::WebhookProcessingError(_) => 500,
            StripeError::LedgerError(_) => 500,
            StripeError::InternalError(_) => 500,
        }
    }
}
