// --- File: crates/perdue_common/src/services.rs ---
//! Service abstractions for external services.
//!
//! Trait definitions that decouple the request handlers from concrete
//! integrations, allowing dependency injection and easier testing.

use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for
/// Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// A trait for the append-only reservation ledger.
///
/// One row per confirmed reservation; the field order of a row is a wire
/// contract with the spreadsheet consumer and is owned by the caller.
pub trait ReservationLedger: Send + Sync {
    /// Append a single row of cell values to the ledger.
    fn append_row(&self, values: Vec<Value>) -> BoxFuture<'_, (), BoxedError>;
}

/// Ledger used when the sheets integration is disabled: logs the row and
/// reports success, so webhook deliveries are still acknowledged.
pub struct NullLedger;

impl ReservationLedger for NullLedger {
    fn append_row(&self, values: Vec<Value>) -> BoxFuture<'_, (), BoxedError> {
        Box::pin(async move {
            info!("Sheets integration disabled, dropping ledger row: {:?}", values);
            Ok(())
        })
    }
}
