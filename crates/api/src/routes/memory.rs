//! `POST /memory-webhook-processor`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use memory_writer::TurnInput;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// The user side of a conversation turn.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    #[serde(default, alias = "message")]
    pub user_message: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

/// Webhook body sent after each conversation turn.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryWebhook {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message_data: Option<MessageData>,
    #[serde(default)]
    pub agent_response: Option<String>,
    #[serde(default)]
    pub turn_number: Option<i64>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Extract and persist memories for one turn.
pub async fn process_memory(
    State(state): State<AppState>,
    payload: std::result::Result<Json<MemoryWebhook>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(webhook) = payload?;

    let (Some(user_id), Some(message_data)) = (
        webhook.user_id.filter(|id| !id.trim().is_empty()),
        webhook.message_data,
    ) else {
        return Err(ApiError::BadRequest(
            "userId and messageData are required".to_string(),
        ));
    };

    let domain = webhook.domain.unwrap_or_else(|| "general".to_string());
    info!(user_id = %user_id, turn = ?webhook.turn_number, domain = %domain, "Processing memory webhook");

    let turn = TurnInput {
        user_id: user_id.clone(),
        user_message: message_data.user_message.unwrap_or_default(),
        agent_response: webhook.agent_response.unwrap_or_default(),
        intent: message_data.intent,
        phone_number: message_data.phone_number,
        turn_number: webhook.turn_number,
        conversation_id: webhook.conversation_id.clone(),
        domain: domain.clone(),
        context: message_data.context,
    };

    let outcome = state.memory.process_turn(&turn).await;

    Ok(Json(json!({
        "success": true,
        "results": outcome.results,
        "memoryBreakdown": outcome.memory_breakdown,
        "metadata": {
            "userId": user_id,
            "domain": domain,
            "turnNumber": webhook.turn_number,
            "conversationId": webhook.conversation_id,
            "preferencesStored": outcome.preferences_stored,
            "factsStored": outcome.facts_stored,
            "processedAt": Utc::now().to_rfc3339(),
        },
    })))
}
