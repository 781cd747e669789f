//! Template catalog operations.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use database::template::{self, NewVersion};
use database::{
    template_content, template_usage, Database, NewButton, NewComponent, NewUsage, Template,
    TemplateButton, TemplateComponent, TemplateStatus, TemplateVersion,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::TemplateError;
use crate::render::Renderer;
use crate::sender::ProviderSender;

/// Text returned when no template is bound to an intent.
pub const FALLBACK_TEXT: &str = "Hello! How can I help you today?";

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_CATEGORY: &str = "UTILITY";

/// Fields for a new template and its first version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub code: String,
    pub domain: String,
    #[serde(default)]
    pub intent_ids: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub meta_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Initial review status; PENDING when absent.
    #[serde(default)]
    pub status: Option<TemplateStatus>,
    #[serde(default)]
    pub sample_json: Option<Value>,
    #[serde(default)]
    pub components: Vec<NewComponent>,
    #[serde(default)]
    pub buttons: Vec<NewButton>,
}

/// Changes to a template. Always produces a new version.
///
/// Version fields that are absent are carried over from the latest version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateUpdate {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub intent_ids: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub meta_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Status of the new version; PENDING when absent.
    #[serde(default)]
    pub status: Option<TemplateStatus>,
    #[serde(default)]
    pub sample_json: Option<Value>,
    #[serde(default)]
    pub components: Option<Vec<NewComponent>>,
    #[serde(default)]
    pub buttons: Option<Vec<NewButton>>,
}

/// A version with its ordered content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDetail {
    #[serde(flatten)]
    pub version: TemplateVersion,
    pub components: Vec<TemplateComponent>,
    pub buttons: Vec<TemplateButton>,
}

/// A template with its latest version, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    #[serde(flatten)]
    pub template: Template,
    pub latest_version: Option<TemplateVersion>,
}

/// A template with its full version history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDetail {
    pub template: Template,
    pub latest_version: Option<VersionDetail>,
    pub versions: Vec<TemplateVersion>,
}

/// Result of an intent lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentTemplate {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub template: Option<Template>,
    pub version: Option<VersionDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_text: Option<String>,
}

/// A send request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendTemplate {
    pub template_id: String,
    pub recipient_phone: String,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub language: Option<String>,
    /// Intent that triggered the send, kept in the usage log.
    #[serde(default)]
    pub intent: Option<String>,
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendReceipt {
    pub success: bool,
    pub message_id: String,
    pub version_id: String,
    pub latency_ms: i64,
    pub rendered_text: String,
}

struct Delivery {
    version_id: String,
    message_id: String,
    text: String,
}

/// Template catalog backed by the database with an injected provider sender.
#[derive(Clone)]
pub struct TemplateManager {
    database: Database,
    sender: Arc<dyn ProviderSender>,
    renderer: Renderer,
}

impl TemplateManager {
    pub fn new(database: Database, sender: Arc<dyn ProviderSender>) -> Result<Self, TemplateError> {
        Ok(Self {
            database,
            sender,
            renderer: Renderer::new()?,
        })
    }

    /// List templates with their latest version.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<TemplateSummary>, TemplateError> {
        let pool = self.database.pool();
        let templates = template::list_templates(pool, include_inactive).await?;

        let mut summaries = Vec::with_capacity(templates.len());
        for template in templates {
            let latest_version = template::latest_version(pool, &template.id).await?;
            summaries.push(TemplateSummary {
                template,
                latest_version,
            });
        }
        Ok(summaries)
    }

    /// Get a template with its version history.
    pub async fn get(&self, template_id: &str) -> Result<TemplateDetail, TemplateError> {
        let pool = self.database.pool();
        let template = template::get_template(pool, template_id).await?;
        let versions = template::list_versions(pool, template_id).await?;
        let latest_version = match versions.last() {
            Some(version) => Some(self.version_detail(version.clone()).await?),
            None => None,
        };

        Ok(TemplateDetail {
            template,
            latest_version,
            versions,
        })
    }

    /// Find the active template bound to an intent and its approved version
    /// in the given language. Falls back to a fixed greeting.
    pub async fn get_for_intent(
        &self,
        intent: &str,
        language: &str,
    ) -> Result<IntentTemplate, TemplateError> {
        let pool = self.database.pool();

        if let Some(template) = template::find_active_by_intent(pool, intent).await? {
            if let Some(version) =
                template::latest_approved_version(pool, &template.id, Some(language)).await?
            {
                return Ok(IntentTemplate {
                    kind: "template",
                    template: Some(template),
                    version: Some(self.version_detail(version).await?),
                    fallback_text: None,
                });
            }
        }

        Ok(IntentTemplate {
            kind: "fallback",
            template: None,
            version: None,
            fallback_text: Some(FALLBACK_TEXT.to_string()),
        })
    }

    /// Create a template with version 1.
    pub async fn create(&self, request: &NewTemplate) -> Result<TemplateDetail, TemplateError> {
        if request.code.trim().is_empty() {
            return Err(TemplateError::Validation("code is required".to_string()));
        }
        if request.domain.trim().is_empty() {
            return Err(TemplateError::Validation("domain is required".to_string()));
        }

        let pool = self.database.pool();
        let template_id = Uuid::new_v4().to_string();
        template::insert_template(
            pool,
            &template_id,
            &request.code,
            &request.domain,
            &request.intent_ids,
            request.description.as_deref(),
        )
        .await?;

        let sample_json = request.sample_json.clone().unwrap_or_else(|| json!({}));
        let version_id = Uuid::new_v4().to_string();
        let version = template::insert_version(
            pool,
            &NewVersion {
                id: &version_id,
                template_id: &template_id,
                language: request.language.as_deref().unwrap_or(DEFAULT_LANGUAGE),
                meta_name: request.meta_name.as_deref(),
                category: request.category.as_deref().unwrap_or(DEFAULT_CATEGORY),
                status: request.status.unwrap_or(TemplateStatus::Pending),
                sample_json: &sample_json,
            },
        )
        .await?;
        template_content::insert_components(pool, &version.id, &request.components).await?;
        template_content::insert_buttons(pool, &version.id, &request.buttons).await?;

        info!(
            template_id = %template_id,
            code = %request.code,
            status = %version.status,
            "Created template"
        );

        self.get(&template_id).await
    }

    /// Apply an update by inserting the next version. Existing versions are untouched.
    pub async fn update(
        &self,
        template_id: &str,
        update: &TemplateUpdate,
    ) -> Result<TemplateDetail, TemplateError> {
        let pool = self.database.pool();
        template::get_template(pool, template_id).await?;

        if update.description.is_some() || update.intent_ids.is_some() || update.is_active.is_some() {
            template::update_template_metadata(
                pool,
                template_id,
                update.description.as_deref(),
                update.intent_ids.as_deref(),
                update.is_active,
            )
            .await?;
        }

        let previous = match template::latest_version(pool, template_id).await? {
            Some(version) => Some(self.version_detail(version).await?),
            None => None,
        };

        let components: Vec<NewComponent> = match &update.components {
            Some(components) => components.clone(),
            None => previous
                .iter()
                .flat_map(|p| p.components.iter().map(NewComponent::from))
                .collect(),
        };
        let buttons: Vec<NewButton> = match &update.buttons {
            Some(buttons) => buttons.clone(),
            None => previous
                .iter()
                .flat_map(|p| p.buttons.iter().map(NewButton::from))
                .collect(),
        };

        let previous_version = previous.as_ref().map(|p| &p.version);
        let language = update
            .language
            .as_deref()
            .or(previous_version.map(|v| v.language.as_str()))
            .unwrap_or(DEFAULT_LANGUAGE);
        let category = update
            .category
            .as_deref()
            .or(previous_version.map(|v| v.category.as_str()))
            .unwrap_or(DEFAULT_CATEGORY);
        let meta_name = update
            .meta_name
            .as_deref()
            .or(previous_version.and_then(|v| v.meta_name.as_deref()));
        let sample_json = update
            .sample_json
            .clone()
            .or_else(|| previous_version.map(|v| v.sample_json.0.clone()))
            .unwrap_or_else(|| json!({}));

        let version_id = Uuid::new_v4().to_string();
        let version = template::insert_version(
            pool,
            &NewVersion {
                id: &version_id,
                template_id,
                language,
                meta_name,
                category,
                status: update.status.unwrap_or(TemplateStatus::Pending),
                sample_json: &sample_json,
            },
        )
        .await?;
        template_content::insert_components(pool, &version.id, &components).await?;
        template_content::insert_buttons(pool, &version.id, &buttons).await?;

        info!(template_id, version = version.version, "Inserted new template version");

        self.get(template_id).await
    }

    /// Record the review outcome of a version. Only forward review
    /// transitions are accepted, so a live version is never reset to PENDING.
    pub async fn set_status(
        &self,
        version_id: &str,
        status: &str,
    ) -> Result<TemplateVersion, TemplateError> {
        let status = TemplateStatus::parse(status)
            .ok_or_else(|| TemplateError::Validation(format!("unknown status: {}", status)))?;
        let pool = self.database.pool();
        let current = template::get_version(pool, version_id).await?;
        let from = TemplateStatus::parse(&current.status).ok_or_else(|| {
            TemplateError::Validation(format!("unknown stored status: {}", current.status))
        })?;
        if !from.can_transition_to(status) {
            return Err(TemplateError::Validation(format!(
                "cannot move version from {} to {}",
                from.as_str(),
                status.as_str()
            )));
        }
        template::set_version_status(pool, version_id, status).await?;

        info!(version_id, status = status.as_str(), "Updated template version status");
        Ok(template::get_version(pool, version_id).await?)
    }

    /// Deactivate a template. Versions and usage history are kept.
    pub async fn delete(&self, template_id: &str) -> Result<(), TemplateError> {
        template::update_template_metadata(self.database.pool(), template_id, None, None, Some(false))
            .await?;
        info!(template_id, "Deactivated template");
        Ok(())
    }

    /// Render and deliver the most recent approved version.
    ///
    /// A usage row is written whether the send succeeds or fails; the
    /// send error is returned after logging.
    pub async fn send(&self, request: &SendTemplate) -> Result<SendReceipt, TemplateError> {
        let started = Instant::now();
        let result = self.deliver(request).await;
        let latency_ms = started.elapsed().as_millis() as i64;

        let usage = NewUsage {
            template_id: Some(request.template_id.clone()).filter(|id| !id.trim().is_empty()),
            version_id: result.as_ref().ok().map(|d| d.version_id.clone()),
            recipient_phone: request.recipient_phone.clone(),
            provider_message_id: result.as_ref().ok().map(|d| d.message_id.clone()),
            latency_ms,
            success: result.is_ok(),
            error_message: result.as_ref().err().map(|e| e.to_string()),
            context: json!({
                "variables": request.variables,
                "language": request.language,
                "intent": request.intent,
            }),
        };
        if let Err(e) = template_usage::insert_usage(self.database.pool(), &usage).await {
            warn!(error = %e, template_id = %request.template_id, "Failed to log template usage");
        }

        match result {
            Ok(delivery) => {
                info!(
                    template_id = %request.template_id,
                    message_id = %delivery.message_id,
                    latency_ms,
                    "Template sent"
                );
                Ok(SendReceipt {
                    success: true,
                    message_id: delivery.message_id,
                    version_id: delivery.version_id,
                    latency_ms,
                    rendered_text: delivery.text,
                })
            }
            Err(e) => {
                warn!(error = %e, template_id = %request.template_id, "Template send failed");
                Err(e)
            }
        }
    }

    async fn deliver(&self, request: &SendTemplate) -> Result<Delivery, TemplateError> {
        if request.template_id.trim().is_empty() {
            return Err(TemplateError::Validation("template_id is required".to_string()));
        }
        if request.recipient_phone.trim().is_empty() {
            return Err(TemplateError::Validation("recipient_phone is required".to_string()));
        }

        let pool = self.database.pool();
        let template = template::get_template(pool, &request.template_id).await?;
        if !template.is_active {
            return Err(TemplateError::Validation("template is inactive".to_string()));
        }

        let version = template::latest_approved_version(
            pool,
            &request.template_id,
            request.language.as_deref(),
        )
        .await?
        .ok_or(TemplateError::NoApprovedVersion)?;

        let detail = self.version_detail(version).await?;
        let text = self
            .renderer
            .render(&detail.components, &detail.buttons, &request.variables);
        let message_id = self.sender.send_text(&request.recipient_phone, &text).await?;

        Ok(Delivery {
            version_id: detail.version.id,
            message_id,
            text,
        })
    }

    async fn version_detail(&self, version: TemplateVersion) -> Result<VersionDetail, TemplateError> {
        let pool = self.database.pool();
        let components = template_content::list_components(pool, &version.id).await?;
        let buttons = template_content::list_buttons(pool, &version.id).await?;
        Ok(VersionDetail {
            version,
            components,
            buttons,
        })
    }
}
