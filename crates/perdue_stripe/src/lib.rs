// --- File: crates/perdue_stripe/src/lib.rs ---

// Declare modules within this crate
pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod routes;
#[cfg(test)]
mod logic_test;

// Re-export for main backend
pub use error::{ReservationError, StripeError};
pub use handlers::StripeState;
pub use logic::{CreateCheckoutSessionResponse, ReservationRequest};
pub use routes::routes;
