//! HTTP API gateway for Code Coach.
//!
//! Exposes a health check at `/` and the chat relay under `/api/v1`.
//! Handlers share one immutable [`GatewayState`]; nothing is stored between
//! requests.
//!
//! Built on Axum.

pub mod api_v1;
pub mod error;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use codecoach_agent::CoachAgent;
use codecoach_config::{AppConfig, GatewayConfig};
use codecoach_providers::OpenAiCompatProvider;

pub use error::{ApiError, ErrorResponse};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<CoachAgent>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS (any origin unless `cors_allowed_origins` is set)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .nest("/api/v1", api_v1::v1_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS policy: an explicit origin list, or any origin when empty.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    if parsed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(parsed)
    }
}

/// Start the gateway HTTP server.
///
/// The provider and agent are built once from `config` and shared by all
/// requests. Runs until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = Arc::new(OpenAiCompatProvider::from_config(&config)?);
    let agent = Arc::new(CoachAgent::from_config(provider, &config));
    let state = Arc::new(GatewayState { agent });

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".into(),
        message: "Welcome to the Code Coach API".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
