//! Smart template router seam.
//!
//! The engine consults a [`SmartRouter`] whenever the session window is
//! closed. Two implementations exist:
//!
//! - [`HttpSmartRouter`] calls a remote `smart-template-router` function.
//! - [`DomainScoringRouter`] scores the message against the domain rules
//!   in-process and is used when no remote router is configured.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::context::MessageContext;
use crate::decision::SmartRouting;
use crate::error::RouterError;
use crate::rules::{DomainRule, RoutingRules};

/// Picks a template when the session window is closed.
///
/// `Ok(None)` means the router had no opinion and the caller should use its
/// own fallback.
#[async_trait]
pub trait SmartRouter: Send + Sync {
    async fn route(&self, context: &MessageContext) -> Result<Option<SmartRouting>, RouterError>;
}

/// Settings for the remote smart template router.
#[derive(Debug, Clone)]
pub struct HttpSmartRouterConfig {
    /// Full URL of the `smart-template-router` function.
    pub url: String,
    /// Optional bearer token.
    pub auth_token: Option<String>,
    /// Request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmartRouterRequest<'a> {
    message: &'a str,
    phone: &'a str,
    user_id: Option<&'a str>,
    session_active: bool,
}

#[derive(Debug, Deserialize)]
struct SmartRouterResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    routing: Option<SmartRouting>,
    #[serde(default)]
    error: Option<String>,
}

/// Smart router backed by the remote `smart-template-router` function.
pub struct HttpSmartRouter {
    client: Client,
    config: HttpSmartRouterConfig,
}

impl HttpSmartRouter {
    pub fn new(config: HttpSmartRouterConfig) -> Result<Self, RouterError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            RouterError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SmartRouter for HttpSmartRouter {
    async fn route(&self, context: &MessageContext) -> Result<Option<SmartRouting>, RouterError> {
        let request = SmartRouterRequest {
            message: &context.message,
            phone: &context.phone,
            user_id: context.user_id.as_deref(),
            session_active: context.session_active,
        };

        let mut call = self.client.post(&self.config.url).json(&request);
        if let Some(token) = &self.config.auth_token {
            call = call.header("Authorization", format!("Bearer {}", token));
        }

        let response = call
            .send()
            .await
            .map_err(|e| RouterError::SmartRouter(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RouterError::SmartRouter(format!(
                "smart-template-router error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: SmartRouterResponse = response
            .json()
            .await
            .map_err(|e| RouterError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if !body.success {
            return Err(RouterError::SmartRouter(
                body.error.unwrap_or_else(|| "success=false".to_string()),
            ));
        }

        debug!(routing = ?body.routing, "Smart router responded");
        Ok(body.routing)
    }
}

/// In-process smart router that scores the message against each domain rule.
#[derive(Debug, Clone)]
pub struct DomainScoringRouter {
    rules: Arc<RoutingRules>,
}

/// Bonus for domains that need a driver profile when the sender is a driver.
const DRIVER_PROFILE_BONUS: u32 = 15;
/// Bonus for the driver domain when the sender is a driver.
const DRIVER_USER_BONUS: u32 = 20;
const MAX_FALLBACKS: usize = 3;

struct DomainScore<'a> {
    rule: &'a DomainRule,
    score: u32,
    keywords: Vec<&'a str>,
}

impl DomainScoringRouter {
    pub fn new(rules: Arc<RoutingRules>) -> Self {
        Self { rules }
    }

    /// Score the context synchronously.
    pub fn score(&self, context: &MessageContext) -> Option<SmartRouting> {
        let lower = context.message.to_lowercase();

        let mut scores: Vec<DomainScore<'_>> = self
            .rules
            .domain_rules
            .iter()
            .filter_map(|rule| {
                let keywords = rule.matches(&lower);
                let mut score = keywords.len() as u32 * rule.priority;
                if rule.requires_driver_profile && context.is_driver() {
                    score += DRIVER_PROFILE_BONUS;
                }
                if rule.domain == "driver" && context.is_driver() {
                    score += DRIVER_USER_BONUS;
                }
                (score > 0).then_some(DomainScore {
                    rule,
                    score,
                    keywords,
                })
            })
            .collect();

        // Stable sort keeps rule order on ties.
        scores.sort_by(|a, b| b.score.cmp(&a.score));

        let best = scores.first()?;
        let template_name = select_template(best.rule, context);
        let fallback_templates = self.fallback_chain(best.rule, &scores[1..]);
        let confidence = (f64::from(best.score) / 100.0).clamp(0.3, 0.95);

        Some(SmartRouting {
            action: None,
            template_name: Some(template_name),
            confidence,
            reasoning: format!(
                "Domain: {}, Score: {}, Keywords: {}",
                best.rule.domain,
                best.score,
                best.keywords.join(", ")
            ),
            domain: Some(best.rule.domain.clone()),
            fallback_templates,
            metadata: Some(json!({
                "intent": best.rule.domain,
                "priority": best.rule.priority,
                "context": {
                    "userType": context.user_type,
                    "sessionActive": context.session_active,
                    "keywordMatches": best.keywords,
                },
            })),
        })
    }

    fn fallback_chain(&self, primary: &DomainRule, others: &[DomainScore<'_>]) -> Vec<String> {
        let candidates = std::iter::once(primary.fallback.as_str())
            .chain(others.iter().take(2).map(|s| s.rule.fallback.as_str()))
            .chain([
                self.rules.welcome_template.as_str(),
                self.rules.support_template.as_str(),
            ]);

        let mut chain: Vec<String> = Vec::with_capacity(MAX_FALLBACKS);
        for candidate in candidates {
            if chain.len() == MAX_FALLBACKS {
                break;
            }
            if !chain.iter().any(|existing| existing == candidate) {
                chain.push(candidate.to_string());
            }
        }
        chain
    }
}

fn select_template(rule: &DomainRule, context: &MessageContext) -> String {
    let pick = |code: &str| -> Option<String> {
        rule.templates
            .iter()
            .find(|template| template.as_str() == code)
            .cloned()
    };

    let chosen = match rule.domain.as_str() {
        "payment" if context.message.chars().any(|c| c.is_ascii_digit()) => {
            pick("tpl_payment_confirmation_v1")
        }
        "driver" if context.location.is_some() => pick("tpl_driver_location_v1"),
        "property" if context.message.contains("search") => pick("tpl_property_search_v1"),
        _ => None,
    };

    chosen
        .or_else(|| rule.templates.first().cloned())
        .unwrap_or_else(|| rule.fallback.clone())
}

#[async_trait]
impl SmartRouter for DomainScoringRouter {
    async fn route(&self, context: &MessageContext) -> Result<Option<SmartRouting>, RouterError> {
        Ok(self.score(context))
    }
}
