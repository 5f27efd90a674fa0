// --- File: crates/perdue_common/src/error.rs ---
use thiserror::Error;

/// The base error type shared across the perdue crates.
///
/// Feature crates define their own error enums and convert into this type
/// where a caller only cares about the broad category.
#[derive(Error, Debug)]
pub enum PerdueError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during authentication or signature verification
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
///
/// Implemented by error types to provide a consistent mapping from error
/// variants to response statuses.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for PerdueError {
    fn status_code(&self) -> u16 {
        match self {
            PerdueError::HttpError(_) => 500,
            PerdueError::ParseError(_) => 400,
            PerdueError::ConfigError(_) => 500,
            PerdueError::AuthError(_) => 401,
            PerdueError::ValidationError(_) => 400,
            PerdueError::ExternalServiceError { .. } => 502,
            PerdueError::InternalError(_) => 500,
        }
    }
}

/// Creates an external service error with the given service name and message.
pub fn external_service_error(
    service_name: impl Into<String>,
    message: impl Into<String>,
) -> PerdueError {
    PerdueError::ExternalServiceError {
        service_name: service_name.into(),
        message: message.into(),
    }
}
