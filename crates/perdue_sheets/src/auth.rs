// --- File: crates/perdue_sheets/src/auth.rs ---
use google_sheets4::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey},
    Sheets,
};
use perdue_config::SheetsConfig;
use std::error::Error;

// Type aliases for clarity
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type SheetsHubType = Sheets<Connector>;

/// Builds a service-account key from the configured credential pair instead
/// of a key file on disk; the private key has already been normalized from
/// its env var encoding by the config layer.
fn service_account_key(config: &SheetsConfig) -> Result<ServiceAccountKey, Box<dyn Error + Send + Sync>> {
    Ok(ServiceAccountKey {
        key_type: Some("service_account".to_string()),
        project_id: None,
        private_key_id: None,
        private_key: config.normalized_private_key()?,
        client_email: config.client_email.clone(),
        client_id: None,
        auth_uri: None,
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        auth_provider_x509_cert_url: None,
        client_x509_cert_url: None,
    })
}

pub async fn create_sheets_hub(
    config: &SheetsConfig,
) -> Result<SheetsHubType, Box<dyn Error + Send + Sync>> {
    let sa_key = service_account_key(config)?;

    let auth = ServiceAccountAuthenticator::builder(sa_key).build().await?;

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()?
        .https_or_http()
        .enable_http1()
        .build();

    // Create client without specifying body type
    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https);

    let hub = Sheets::new(client, auth);

    Ok(hub)
}
