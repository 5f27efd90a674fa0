// --- File: crates/perdue_config/src/lib.rs ---

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use thiserror::Error;

pub mod models;
pub use models::*;

/// Errors produced while validating a loaded configuration.
#[derive(Error, Debug)]
pub enum ConfigValidationError {
    #[error("missing config section: {0}")]
    MissingSection(&'static str),
    #[error("missing secret: {0}")]
    MissingSecret(&'static str),
    #[error("failed to decode service account key: {0}")]
    KeyDecode(String),
    #[error("invalid weekday in reservation.allowed_days: {0}")]
    InvalidWeekday(String),
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Ensures the `.env` file is loaded into the process environment exactly
/// once, regardless of how many crates call through here.
pub fn ensure_dotenv_loaded() {
    let dotenv_path =
        env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());
    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });
}

/// Loads and validates the application configuration.
///
/// Sources, later entries overriding earlier ones:
/// 1. `config/default` (any format the `config` crate understands)
/// 2. `config/{RUN_ENV}`
/// 3. environment variables with the `PD` prefix and `__` separator,
///    e.g. `PD__SERVER__PORT=8086`
///
/// Secrets are then injected from their conventional env var names so that
/// deployment only has to provide `STRIPE_SECRET_KEY` and friends.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env::var("PREFIX").unwrap_or_else(|_| "PD".to_string());
    let config_dir = env::var("PD_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    let builder = Config::builder()
        .add_source(File::with_name(&format!("{config_dir}/default")).required(false))
        .add_source(File::with_name(&format!("{config_dir}/{run_env}")).required(false))
        .add_source(Environment::with_prefix(&prefix).separator("__"));

    let mut config: AppConfig = builder.build()?.try_deserialize()?;
    apply_secret_env_overrides(&mut config);

    config
        .validate()
        .map_err(|err| ConfigError::Message(err.to_string()))?;
    Ok(config)
}

/// Injects secrets from their conventional env var names. Values already set
/// through config files or `PD`-prefixed vars are overridden: the plain env
/// var is the deployment's source of truth for credentials.
fn apply_secret_env_overrides(config: &mut AppConfig) {
    if let Some(stripe) = config.stripe.as_mut() {
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            stripe.secret_key = Some(v);
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            stripe.webhook_secret = Some(v);
        }
    }
    if let Some(sheets) = config.sheets.as_mut() {
        if let Ok(v) = env::var("GOOGLE_SHEETS_CLIENT_EMAIL") {
            sheets.client_email = v;
        }
        if let Ok(v) = env::var("GOOGLE_SHEETS_PRIVATE_KEY") {
            sheets.private_key = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_SHEETS_SPREADSHEET_ID") {
            sheets.spreadsheet_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_SHEETS_SHEET_NAME") {
            sheets.sheet_name = v;
        }
    }
}

#[cfg(test)]
mod models_test;
