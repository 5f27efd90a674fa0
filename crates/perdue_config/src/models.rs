// --- File: crates/perdue_config/src/models.rs ---

use base64::{engine::general_purpose::STANDARD as base64_engine, Engine as _};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ConfigValidationError;

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

// --- CORS Config ---
// Browser-facing origin allow-list for the checkout endpoint. The webhook
// endpoint is server-to-server and does not use it.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// --- Stripe Config ---
// URLs and pricing are configured here; STRIPE_SECRET_KEY and
// STRIPE_WEBHOOK_SECRET are injected from env vars by load_config.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    pub success_url: String, // Mandatory
    pub cancel_url: String,  // Mandatory
    pub currency: Option<String>,
    pub unit_amount: Option<i64>,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    /// Override for tests; production always talks to api.stripe.com.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl StripeConfig {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or("https://api.stripe.com")
    }
}

// --- Reservation business rules ---
// Defaults encode the deposit tier the restaurant actually sells: tables of
// two, Friday through Sunday, two seatings.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReservationConfig {
    #[serde(default = "default_party_size")]
    pub party_size: i64,
    #[serde(default = "default_allowed_times")]
    pub allowed_times: Vec<String>,
    #[serde(default = "default_allowed_days")]
    pub allowed_days: Vec<String>,
}

fn default_party_size() -> i64 {
    2
}

fn default_allowed_times() -> Vec<String> {
    vec!["18:30".to_string(), "20:30".to_string()]
}

fn default_allowed_days() -> Vec<String> {
    vec!["fri".to_string(), "sat".to_string(), "sun".to_string()]
}

impl Default for ReservationConfig {
    fn default() -> Self {
        ReservationConfig {
            party_size: default_party_size(),
            allowed_times: default_allowed_times(),
            allowed_days: default_allowed_days(),
        }
    }
}

impl ReservationConfig {
    /// Parses the configured day names ("fri", "friday", ...) into weekdays.
    pub fn allowed_weekdays(&self) -> Result<Vec<Weekday>, ConfigValidationError> {
        self.allowed_days
            .iter()
            .map(|d| {
                Weekday::from_str(d)
                    .map_err(|_| ConfigValidationError::InvalidWeekday(d.clone()))
            })
            .collect()
    }
}

// --- Google Sheets Config ---
// The service-account credential pair (client email + private key) comes from
// env vars; the key arrives in one of several encodings, declared explicitly
// instead of auto-detected.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// The key is a ready-to-use PEM block.
    Pem,
    /// Literal `\n` sequences stand in for newlines (the usual single-line
    /// env var convention).
    #[default]
    EscapedPem,
    /// The whole PEM block is base64-encoded once more.
    Base64,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetsConfig {
    pub client_email: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_key_encoding: KeyEncoding,
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl SheetsConfig {
    /// Reconstructs the PEM private key from its configured encoding.
    ///
    /// A malformed reconstruction silently breaks request signing, so the
    /// result is checked for a PEM marker here rather than at first use.
    pub fn normalized_private_key(&self) -> Result<String, ConfigValidationError> {
        let raw = self
            .private_key
            .as_deref()
            .ok_or(ConfigValidationError::MissingSecret("GOOGLE_SHEETS_PRIVATE_KEY"))?;

        let pem = match self.private_key_encoding {
            KeyEncoding::Pem => raw.to_string(),
            KeyEncoding::EscapedPem => raw.replace("\\n", "\n"),
            KeyEncoding::Base64 => {
                let bytes = base64_engine
                    .decode(raw.trim())
                    .map_err(|e| ConfigValidationError::KeyDecode(e.to_string()))?;
                String::from_utf8(bytes)
                    .map_err(|e| ConfigValidationError::KeyDecode(e.to_string()))?
            }
        };

        if !pem.contains("-----BEGIN") {
            return Err(ConfigValidationError::KeyDecode(
                "decoded key is not a PEM block".to_string(),
            ));
        }
        Ok(pem)
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_stripe: bool,
    #[serde(default)]
    pub use_sheets: bool,

    #[serde(default)]
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub reservation: ReservationConfig,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub sheets: Option<SheetsConfig>,
}

impl AppConfig {
    /// Validates the configuration at construction time so that missing
    /// credentials fail the process at startup instead of the first request.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.reservation.allowed_weekdays()?;

        if self.use_stripe {
            let stripe = self
                .stripe
                .as_ref()
                .ok_or(ConfigValidationError::MissingSection("stripe"))?;
            if stripe.secret_key.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigValidationError::MissingSecret("STRIPE_SECRET_KEY"));
            }
            if stripe.webhook_secret.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigValidationError::MissingSecret("STRIPE_WEBHOOK_SECRET"));
            }
        }

        if self.use_sheets {
            let sheets = self
                .sheets
                .as_ref()
                .ok_or(ConfigValidationError::MissingSection("sheets"))?;
            if sheets.client_email.is_empty() {
                return Err(ConfigValidationError::MissingSecret(
                    "GOOGLE_SHEETS_CLIENT_EMAIL",
                ));
            }
            if sheets.spreadsheet_id.is_empty() {
                return Err(ConfigValidationError::MissingSecret(
                    "GOOGLE_SHEETS_SPREADSHEET_ID",
                ));
            }
            if sheets.sheet_name.is_empty() {
                return Err(ConfigValidationError::MissingSecret(
                    "GOOGLE_SHEETS_SHEET_NAME",
                ));
            }
            sheets.normalized_private_key()?;
        }

        Ok(())
    }
}
