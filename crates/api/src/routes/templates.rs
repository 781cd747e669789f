//! `POST /whatsapp-templates-manager`.
//!
//! A single endpoint dispatching on `action`.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use template_manager::{NewTemplate, SendTemplate, TemplateUpdate};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Template manager request. Fields are read per action.
#[derive(Debug, Default, Deserialize)]
pub struct TemplateRequest {
    pub action: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub template_data: Option<Value>,
    #[serde(default)]
    pub recipient_phone: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    List,
    Get,
    Create,
    Update,
    SetStatus,
    Delete,
    Send,
}

impl Action {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "list" => Some(Action::List),
            "get" | "get_template" => Some(Action::Get),
            "create" | "create_template" => Some(Action::Create),
            "update" | "update_template" => Some(Action::Update),
            "set_status" => Some(Action::SetStatus),
            "delete" => Some(Action::Delete),
            "send" | "send_template" => Some(Action::Send),
            _ => None,
        }
    }
}

impl TemplateRequest {
    /// Template id from the top level or from `template_data`.
    fn resolve_template_id(&self) -> Option<String> {
        self.template_id.clone().or_else(|| {
            let data = self.template_data.as_ref()?;
            ["template_id", "id"]
                .iter()
                .find_map(|key| data.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        })
    }

    fn require_template_id(&self) -> Result<String> {
        self.resolve_template_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("template_id is required".to_string()))
    }

    fn template_data<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .template_data
            .clone()
            .ok_or_else(|| ApiError::BadRequest("template_data is required".to_string()))?;
        serde_json::from_value(data)
            .map_err(|e| ApiError::BadRequest(format!("invalid template_data: {}", e)))
    }
}

/// Dispatch a template manager action.
pub async fn manage_templates(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TemplateRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload?;
    let action = Action::parse(&request.action)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown action: {}", request.action)))?;

    info!(action = %request.action, intent = ?request.intent, "Template manager request");
    let templates = &state.templates;

    let body = match action {
        Action::List => {
            let list = templates.list(request.include_inactive).await?;
            json!({ "success": true, "templates": list })
        }
        Action::Get => match (request.resolve_template_id(), request.intent.as_deref()) {
            (Some(template_id), _) => {
                let detail = templates.get(&template_id).await?;
                json!({ "success": true, "template": detail })
            }
            (None, Some(intent)) => {
                let language = request.language.as_deref().unwrap_or("en");
                json!(templates.get_for_intent(intent, language).await?)
            }
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "template_id or intent is required".to_string(),
                ))
            }
        },
        Action::Create => {
            let new_template: NewTemplate = request.template_data()?;
            let detail = templates.create(&new_template).await?;
            json!({ "success": true, "template": detail })
        }
        Action::Update => {
            let template_id = request.require_template_id()?;
            let update: TemplateUpdate = request.template_data()?;
            let detail = templates.update(&template_id, &update).await?;
            json!({ "success": true, "template": detail })
        }
        Action::SetStatus => {
            let (Some(version_id), Some(status)) = (&request.version_id, &request.status) else {
                return Err(ApiError::BadRequest(
                    "version_id and status are required".to_string(),
                ));
            };
            let version = templates.set_status(version_id, status).await?;
            json!({ "success": true, "version": version })
        }
        Action::Delete => {
            let template_id = request.require_template_id()?;
            templates.delete(&template_id).await?;
            json!({ "success": true, "template_id": template_id })
        }
        Action::Send => {
            let template_id = request.require_template_id()?;
            let recipient_phone = request
                .recipient_phone
                .clone()
                .filter(|phone| !phone.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("recipient_phone is required".to_string()))?;
            let receipt = templates
                .send(&SendTemplate {
                    template_id,
                    recipient_phone,
                    variables: request.variables.clone(),
                    language: request.language.clone(),
                    intent: request.intent.clone(),
                })
                .await?;
            json!(receipt)
        }
    };

    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_aliases() {
        assert_eq!(Action::parse("send_template"), Some(Action::Send));
        assert_eq!(Action::parse("get_template"), Some(Action::Get));
        assert_eq!(Action::parse("sync_meta"), None);
    }

    #[test]
    fn test_template_id_from_template_data() {
        let request: TemplateRequest = serde_json::from_value(json!({
            "action": "update_template",
            "template_data": { "id": "t-1", "description": "x" }
        }))
        .unwrap();
        assert_eq!(request.resolve_template_id().as_deref(), Some("t-1"));
    }
}
