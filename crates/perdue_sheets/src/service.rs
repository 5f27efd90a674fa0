// --- File: crates/perdue_sheets/src/service.rs ---
//! Google Sheets ledger implementation.
//!
//! Implements the ReservationLedger trait by appending rows to the
//! configured spreadsheet tab.

use google_sheets4::api::ValueRange;
use perdue_common::services::{BoxFuture, BoxedError, ReservationLedger};
use perdue_config::SheetsConfig;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::auth::SheetsHubType;

/// Errors that can occur when appending to the spreadsheet.
#[derive(Error, Debug)]
pub enum SheetsLedgerError {
    #[error("Google Sheets API Error: {0}")]
    ApiError(#[from] google_sheets4::Error),
}

/// A1 range covering the whole tab; the append API finds the first free row.
fn append_range(sheet_name: &str) -> String {
    format!("{}!A:Z", sheet_name)
}

/// Google Sheets ledger: one appended row per confirmed reservation.
pub struct GoogleSheetsLedger {
    sheets_hub: Arc<SheetsHubType>,
    spreadsheet_id: String,
    range: String,
}

impl GoogleSheetsLedger {
    /// Create a new Google Sheets ledger for the configured spreadsheet tab.
    pub fn new(sheets_hub: Arc<SheetsHubType>, config: &SheetsConfig) -> Self {
        Self {
            sheets_hub,
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: append_range(&config.sheet_name),
        }
    }
}

impl ReservationLedger for GoogleSheetsLedger {
    fn append_row(&self, values: Vec<Value>) -> BoxFuture<'_, (), BoxedError> {
        Box::pin(async move {
            let request = ValueRange {
                values: Some(vec![values]),
                ..Default::default()
            };

            self.sheets_hub
                .spreadsheets()
                .values_append(request, &self.spreadsheet_id, &self.range)
                .value_input_option("USER_ENTERED")
                .doit()
                .await
                .map_err(|e| BoxedError(Box::new(SheetsLedgerError::ApiError(e))))?;

            info!("Appended reservation row to range {}", self.range);
            Ok(())
        })
    }
}
