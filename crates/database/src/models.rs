//! Database models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

/// A WhatsApp contact, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    /// Phone number in international format (e.g., "+250788123456").
    pub phone_number: String,
    /// Display name, if known.
    pub name: Option<String>,
    /// Preferred language code (e.g., "en", "rw", "fr").
    pub preferred_language: Option<String>,
    /// Timestamp of the last inbound message.
    pub last_interaction: Option<String>,
    /// Number of conversations held with this contact.
    pub total_conversations: i64,
    /// Creation timestamp.
    pub created_at: String,
}

/// A registered driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Driver {
    /// Driver phone number.
    pub phone_number: String,
    /// Availability status ("online", "offline", "busy").
    pub status: String,
    /// Last reported location, free text.
    pub location: Option<String>,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A conversation analytics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationAnalytics {
    pub id: i64,
    pub phone_number: String,
    pub total_messages: i64,
    pub conversion_event: Option<String>,
    pub created_at: String,
}

/// Kind of memory row stored in `agent_memory_enhanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// One conversation turn (user message + agent response).
    Conversation,
    /// A stated preference (language, payment method).
    Preference,
    /// A stated fact about the user (name, employer, residence).
    Fact,
}

impl MemoryType {
    /// Column value for this memory type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Conversation => "conversation",
            MemoryType::Preference => "preference",
            MemoryType::Fact => "fact",
        }
    }
}

/// A persisted memory row. Rows are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MemoryRecord {
    pub id: i64,
    pub user_id: String,
    pub memory_type: String,
    pub memory_key: String,
    /// `{ "content": ..., "metadata": { ... } }`
    pub memory_value: Json<Value>,
    pub importance_weight: f64,
    pub confidence_score: f64,
    pub created_at: String,
}

impl MemoryRecord {
    /// The `content` string of the memory value, if present.
    pub fn content(&self) -> Option<&str> {
        self.memory_value.0.get("content").and_then(Value::as_str)
    }
}

/// A memory row to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub user_id: String,
    pub memory_type: MemoryType,
    pub memory_key: String,
    pub memory_value: Value,
    pub importance_weight: f64,
    pub confidence_score: f64,
}

/// An audit row written by each handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogEntry {
    pub id: i64,
    pub user_id: Option<String>,
    pub function_name: String,
    pub input_data: Json<Value>,
    pub output_data: Json<Value>,
    pub success_status: bool,
    pub execution_time_ms: i64,
    pub created_at: String,
}

/// A stored conversation summary for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationSummary {
    /// Owning user.
    pub user_id: String,
    /// Summary text returned by the summarizer.
    pub summary: String,
    /// Turn number at which the summary was produced.
    pub turn_count: i64,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Stored behavioral score used by the predictive engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BehaviorScore {
    pub user_id: String,
    /// Last engagement probability, in (0, 1).
    pub engagement_score: f64,
    /// Optional user-type tag ("driver", "bar_owner", "vendor").
    pub user_type: Option<String>,
    pub updated_at: String,
}

/// Review status of a template version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Paused,
}

impl TemplateStatus {
    /// Column value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Draft => "DRAFT",
            TemplateStatus::Pending => "PENDING",
            TemplateStatus::Approved => "APPROVED",
            TemplateStatus::Rejected => "REJECTED",
            TemplateStatus::Paused => "PAUSED",
        }
    }

    /// Whether a version may move from `self` to `next`.
    ///
    /// Review only moves forward: DRAFT to PENDING, PENDING to APPROVED or
    /// REJECTED. An approved version can be paused and resumed. Setting the
    /// current status again is allowed.
    pub fn can_transition_to(&self, next: TemplateStatus) -> bool {
        use TemplateStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Draft, Pending)
                    | (Pending, Approved)
                    | (Pending, Rejected)
                    | (Approved, Paused)
                    | (Paused, Approved)
            )
    }

    /// Parse a status from its column value (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Some(TemplateStatus::Draft),
            "PENDING" => Some(TemplateStatus::Pending),
            "APPROVED" => Some(TemplateStatus::Approved),
            "REJECTED" => Some(TemplateStatus::Rejected),
            "PAUSED" => Some(TemplateStatus::Paused),
            _ => None,
        }
    }
}

/// A logical template grouping localized versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Template {
    pub id: String,
    /// Stable template code (e.g., "tpl_payments_quick_v1").
    pub code: String,
    pub domain: String,
    pub intent_ids: Json<Vec<String>>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// One localized, versioned revision of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TemplateVersion {
    pub id: String,
    pub template_id: String,
    /// Monotonic per-template revision counter.
    pub version: i64,
    pub language: String,
    pub meta_name: Option<String>,
    /// WhatsApp category ("UTILITY", "MARKETING", "AUTHENTICATION").
    pub category: String,
    pub status: String,
    pub sample_json: Json<Value>,
    pub created_at: String,
}

impl TemplateVersion {
    /// Whether this version may be sent.
    pub fn is_approved(&self) -> bool {
        TemplateStatus::parse(&self.status) == Some(TemplateStatus::Approved)
    }
}

/// A text segment of a template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TemplateComponent {
    pub id: i64,
    pub version_id: String,
    /// "HEADER", "BODY" or "FOOTER".
    pub component_type: String,
    /// Text with `{{variable}}` placeholders.
    pub text: Option<String>,
    pub format: String,
    pub position: i64,
}

/// A quick-reply or URL button of a template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TemplateButton {
    pub id: i64,
    pub version_id: String,
    pub btn_type: String,
    pub text: String,
    pub url: Option<String>,
    pub phone_number: Option<String>,
    pub payload_key: Option<String>,
    pub position: i64,
}

/// One send attempt of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TemplateUsage {
    pub id: i64,
    pub template_id: Option<String>,
    pub version_id: Option<String>,
    pub recipient_phone: String,
    /// Provider message id; `None` when the send failed.
    pub provider_message_id: Option<String>,
    pub latency_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
    /// Variables and intent context used for the send.
    pub context: Json<Value>,
    pub sent_at: String,
}

/// A component to attach to a new template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComponent {
    #[serde(rename = "type", default = "default_component_type")]
    pub component_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_component_format")]
    pub format: String,
    /// Ordering position; assigned from list order when absent.
    #[serde(default)]
    pub position: Option<i64>,
}

/// A button to attach to a new template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewButton {
    #[serde(rename = "type", default = "default_button_type")]
    pub btn_type: String,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub payload_key: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
}

/// A template usage row to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUsage {
    pub template_id: Option<String>,
    pub version_id: Option<String>,
    pub recipient_phone: String,
    pub provider_message_id: Option<String>,
    pub latency_ms: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub context: Value,
}

fn default_component_type() -> String {
    "BODY".to_string()
}

fn default_component_format() -> String {
    "TEXT".to_string()
}

fn default_button_type() -> String {
    "QUICK_REPLY".to_string()
}

impl From<&TemplateComponent> for NewComponent {
    fn from(component: &TemplateComponent) -> Self {
        Self {
            component_type: component.component_type.clone(),
            text: component.text.clone(),
            format: component.format.clone(),
            position: Some(component.position),
        }
    }
}

impl From<&TemplateButton> for NewButton {
    fn from(button: &TemplateButton) -> Self {
        Self {
            btn_type: button.btn_type.clone(),
            text: button.text.clone(),
            url: button.url.clone(),
            phone_number: button.phone_number.clone(),
            payload_key: button.payload_key.clone(),
            position: Some(button.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_only_move_forward() {
        use TemplateStatus::*;

        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Approved));

        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Draft));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Draft.can_transition_to(Approved));
    }
}
