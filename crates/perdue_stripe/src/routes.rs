// --- File: crates/perdue_stripe/src/routes.rs ---

use crate::handlers::{
    create_checkout_session_handler, method_not_allowed_handler, preflight_handler,
    stripe_webhook_handler, StripeState,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::post,
    Router,
};
use perdue_common::ReservationLedger;
use perdue_config::{AppConfig, CorsConfig};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

/// Builds the browser-facing CORS layer from the configured origin
/// allow-list. Requests from origins outside the list get no
/// Access-Control-Allow-Origin header at all.
fn cors_layer(config: Option<&CorsConfig>) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .map(|c| c.allowed_origins.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparseable CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Creates a router containing all routes for the Stripe feature.
///
/// The checkout route carries the CORS layer; the webhook route is
/// server-to-server and does not.
pub fn routes(config: Arc<AppConfig>, ledger: Arc<dyn ReservationLedger>) -> Router {
    let cors = cors_layer(config.cors.as_ref());
    let stripe_state = Arc::new(StripeState { config, ledger });

    let checkout = Router::new()
        .route(
            "/create-checkout-session",
            post(create_checkout_session_handler)
                .options(preflight_handler)
                .fallback(method_not_allowed_handler),
        )
        .layer(cors)
        .with_state(stripe_state.clone());

    let webhook = Router::new()
        .route("/stripe/webhook", post(stripe_webhook_handler))
        .with_state(stripe_state);

    checkout.merge(webhook)
}
