//! Routing decision types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Template code used when nothing better is known.
pub const WELCOME_TEMPLATE: &str = "tpl_welcome_quick_v1";

/// How the inbound message should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    /// Reply with a pre-approved WhatsApp template (valid outside the session window).
    Template,
    /// Reply with an interactive menu payload (session window only).
    Interactive,
    /// Hand the conversation to a downstream agent.
    Agent,
}

/// The outcome of a routing call.
///
/// `confidence` is a heuristic weight in [0, 1], not a calibrated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub action: RoutingAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_templates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl RoutingDecision {
    /// Reply with a template.
    pub fn template(name: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            action: RoutingAction::Template,
            template_name: Some(name.into()),
            confidence,
            reasoning: reasoning.into(),
            interactive_payload: None,
            fallback_templates: None,
            metadata: None,
        }
    }

    /// Reply with an interactive payload.
    pub fn interactive(payload: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            action: RoutingAction::Interactive,
            template_name: None,
            confidence,
            reasoning: reasoning.into(),
            interactive_payload: Some(payload.into()),
            fallback_templates: None,
            metadata: None,
        }
    }

    /// Attach fallback template names for the caller to try on send failure.
    pub fn with_fallbacks(mut self, fallbacks: Vec<String>) -> Self {
        self.fallback_templates = Some(fallbacks);
        self
    }

    /// Attach a metadata bag.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Safe decision returned when the request itself could not be processed.
    pub fn error_fallback(error: &str) -> Self {
        Self::template(WELCOME_TEMPLATE, 0.3, "Error fallback - using welcome template")
            .with_fallbacks(vec![
                "tpl_support_quick_v1".to_string(),
                "tpl_main_menu_v1".to_string(),
            ])
            .with_metadata(serde_json::json!({
                "intent": "error_fallback",
                "error": error,
            }))
    }

    /// Short description for logging.
    pub fn description(&self) -> String {
        match self.action {
            RoutingAction::Template => format!(
                "template: {} ({:.2})",
                self.template_name.as_deref().unwrap_or("-"),
                self.confidence
            ),
            RoutingAction::Interactive => format!(
                "interactive: {} ({:.2})",
                self.interactive_payload.as_deref().unwrap_or("-"),
                self.confidence
            ),
            RoutingAction::Agent => format!("agent ({:.2})", self.confidence),
        }
    }
}

/// Routing returned by a smart template router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartRouting {
    /// Explicit action; absent means template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RoutingAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub fallback_templates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl SmartRouting {
    /// Convert into a decision, passing fields through unchanged.
    ///
    /// Returns `None` for a template routing without a template name.
    pub fn into_decision(self) -> Option<RoutingDecision> {
        let action = self.action.unwrap_or(RoutingAction::Template);
        if action == RoutingAction::Template && self.template_name.is_none() {
            return None;
        }

        Some(RoutingDecision {
            action,
            template_name: self.template_name,
            confidence: self.confidence,
            reasoning: self.reasoning,
            interactive_payload: None,
            fallback_templates: if self.fallback_templates.is_empty() {
                None
            } else {
                Some(self.fallback_templates)
            },
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serializes_camel_case() {
        let decision = RoutingDecision::template("tpl_payments_quick_v1", 0.8, "payment")
            .with_fallbacks(vec![WELCOME_TEMPLATE.to_string()]);
        let json = serde_json::to_value(&decision).unwrap();

        assert_eq!(json["action"], "template");
        assert_eq!(json["templateName"], "tpl_payments_quick_v1");
        assert_eq!(json["fallbackTemplates"][0], WELCOME_TEMPLATE);
        assert!(json.get("interactivePayload").is_none());
    }

    #[test]
    fn test_smart_routing_passthrough() {
        let routing: SmartRouting = serde_json::from_str(
            r#"{
                "templateName": "tpl_property_search_v1",
                "confidence": 0.42,
                "reasoning": "Domain: property, Score: 16",
                "domain": "property",
                "fallbackTemplates": ["tpl_property_quick_v1", "tpl_welcome_quick_v1"]
            }"#,
        )
        .unwrap();

        let decision = routing.into_decision().unwrap();
        assert_eq!(decision.action, RoutingAction::Template);
        assert_eq!(decision.template_name.as_deref(), Some("tpl_property_search_v1"));
        assert_eq!(decision.confidence, 0.42);
        assert_eq!(decision.reasoning, "Domain: property, Score: 16");
        assert_eq!(decision.fallback_templates.unwrap().len(), 2);
    }

    #[test]
    fn test_smart_routing_without_template_is_unusable() {
        let routing: SmartRouting =
            serde_json::from_str(r#"{"confidence": 0.9, "reasoning": "?"}"#).unwrap();
        assert!(routing.into_decision().is_none());
    }

    #[test]
    fn test_smart_routing_agent_handoff() {
        let routing: SmartRouting = serde_json::from_str(
            r#"{"action": "agent", "confidence": 0.7, "reasoning": "complex request"}"#,
        )
        .unwrap();
        let decision = routing.into_decision().unwrap();
        assert_eq!(decision.action, RoutingAction::Agent);
        assert!(decision.template_name.is_none());
    }

    #[test]
    fn test_error_fallback_is_welcome() {
        let decision = RoutingDecision::error_fallback("boom");
        assert_eq!(decision.template_name.as_deref(), Some(WELCOME_TEMPLATE));
        assert_eq!(decision.confidence, 0.3);
        assert_eq!(decision.metadata.unwrap()["error"], "boom");
    }
}
