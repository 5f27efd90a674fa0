// --- File: crates/perdue_sheets/src/lib.rs ---
// Declare modules within this crate
pub mod auth;
pub mod service;

// Re-export for main backend
pub use auth::{create_sheets_hub, SheetsHubType};
pub use service::{GoogleSheetsLedger, SheetsLedgerError};
