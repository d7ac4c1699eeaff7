//! HTTP and websocket surface of the Parlor voice bridge.
//!
//! Two routes: `/health` for monitoring and `/ws/voice` for browser voice
//! sessions. Everything behind the turn boundary lives in `parlor-voice`;
//! this crate owns transport, configuration, and process lifecycle.

pub mod api_ws;
pub mod config;

use axum::http::HeaderValue;
use axum::{routing::get, Extension, Json, Router};
use parlor_voice::VoicePipeline;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Shared application state injected into every handler.
pub struct AppState {
    pub pipeline: Arc<VoicePipeline>,
}

/// Health check handler.
///
/// Returns `200 OK` with server status and version. Used by load balancers,
/// monitoring, and CI to verify the server is running.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
///
/// CORS admits the configured browser origins only, with credentials;
/// entries that do not parse as header values are skipped with a warning.
/// Methods and headers mirror the request because wildcard allowances
/// cannot be combined with credentialed CORS.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    Router::new()
        .route("/health", get(health))
        .route("/ws/voice", get(api_ws::ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request()),
        )
        .layer(Extension(Arc::new(state)))
}
