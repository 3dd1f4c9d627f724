//! services/frontend/src/bin/frontend.rs

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use frontend_lib::{
    adapters::{HttpDetectionApi, SnapshotCamera},
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, AppState},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let api = Arc::new(HttpDetectionApi::new(
        config.api_base_url.clone(),
        config.request_timeout,
    )?);
    let camera = Arc::new(SnapshotCamera::new(
        config.camera_user_snapshot_url.clone(),
        config.camera_environment_snapshot_url.clone(),
        config.request_timeout,
    )?);
    if config.camera_user_snapshot_url.is_none()
        && config.camera_environment_snapshot_url.is_none()
    {
        warn!("No camera snapshot URL configured; camera capture is unavailable");
    }
    info!(backend = %config.api_base_url, "Detection backend configured");

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), api, camera));

    // --- 4. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state.clone()).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Wire Up Graceful Shutdown ---
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!("Failed to listen for the shutdown signal: {}", e),
            }
            shutdown.cancel();
        }
    });

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    // Leaving the view: stop the camera and revoke previews.
    app_state.workspace.lock().await.teardown();
    info!("Server stopped");

    Ok(())
}
