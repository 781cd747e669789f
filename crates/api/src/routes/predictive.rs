//! `POST /predictive-response`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use predictive_response::{PredictionError, PredictionOutcome, PredictionRequest};
use serde_json::json;
use tracing::error;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Predict likely responses for the current message.
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;

    match state.predictive.predict(&request).await {
        Ok(outcome) => Ok(Json(json!({
            "success": true,
            "predictions": outcome.predictions,
            "patterns": outcome.patterns,
        }))
        .into_response()),
        Err(PredictionError::InvalidRequest(message)) => Err(ApiError::BadRequest(message)),
        Err(e) => {
            error!(error = %e, user_id = %request.user_id, "Prediction failed");
            let fallback = PredictionOutcome::degraded();
            let body = json!({
                "success": false,
                "error": e.to_string(),
                "predictions": fallback.predictions,
                "patterns": fallback.patterns,
            });
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}
