//! `POST /intelligent-message-router`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use message_router::RoutingDecision;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Inbound message to route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    /// Message text. May be empty, e.g. for media-only messages.
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "phoneNumber")]
    pub phone: String,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides the session state derived from the last interaction.
    #[serde(default)]
    pub session_active: Option<bool>,
}

/// Decide how to answer an inbound message.
pub async fn route_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    if request.phone.trim().is_empty() {
        return Err(ApiError::BadRequest("phone is required".to_string()));
    }

    info!(phone = %request.phone, session_active = ?request.session_active, "Routing message");

    let context = match state
        .context_loader
        .load(
            &request.message,
            request.user_id.as_deref(),
            &request.phone,
            request.session_active,
        )
        .await
    {
        Ok(context) => context,
        Err(e) => {
            error!(error = %e, phone = %request.phone, "Failed to load message context");
            let body = json!({
                "success": false,
                "error": e.to_string(),
                "routing": RoutingDecision::error_fallback(&e.to_string()),
            });
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
        }
    };

    let routing = state.routing.determine_routing(&context).await;

    Ok(Json(json!({
        "success": true,
        "routing": routing,
        "context": {
            "userType": context.user_type,
            "sessionActive": context.session_active,
        },
    }))
    .into_response())
}
