// File: crates/services/perdue_backend/src/main.rs
use axum::{routing::get, Router};
use perdue_common::services::{NullLedger, ReservationLedger};
use perdue_config::load_config;
use perdue_sheets::{create_sheets_hub, GoogleSheetsLedger};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    let config = Arc::new(load_config().expect("Failed to load config"));
    perdue_common::logging::init();

    // Config validation already guaranteed the sheets section and credentials
    // exist when the flag is on.
    let ledger: Arc<dyn ReservationLedger> = if config.use_sheets {
        let sheets_config = config.sheets.as_ref().expect("sheets config validated at load");
        let hub = create_sheets_hub(sheets_config)
            .await
            .expect("Failed to create Google Sheets client");
        Arc::new(GoogleSheetsLedger::new(Arc::new(hub), sheets_config))
    } else {
        warn!("Sheets integration disabled; confirmed reservations are logged only");
        Arc::new(NullLedger)
    };

    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the per due reservations API!" }))
        .merge(perdue_stripe::routes(config.clone(), ledger));

    #[allow(unused_mut)] // mutated when the openapi feature is enabled
    let mut app = Router::new().nest("/api", api_router);

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use perdue_stripe::doc::StripeApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "per due API",
                version = "0.1.0",
                description = "Reservation deposit service API docs"
            ),
            servers((url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(StripeApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");

        let swagger_ui =
            SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
