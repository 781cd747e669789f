//! Route handlers for the easyMO API.

pub mod health;
pub mod memory;
pub mod predictive;
pub mod router;
pub mod templates;

use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/intelligent-message-router", post(router::route_message))
        .route("/memory-webhook-processor", post(memory::process_memory))
        .route("/predictive-response", post(predictive::predict))
        .route("/whatsapp-templates-manager", post(templates::manage_templates))
        .layer(cors())
}

/// Browser clients call the endpoints directly, so any origin is allowed.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}
