//! Routing decision engine.

use std::sync::Arc;
use std::time::Instant;

use database::{execution_log, Database};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::context::MessageContext;
use crate::decision::RoutingDecision;
use crate::rules::RoutingRules;
use crate::smart::SmartRouter;

/// Function name recorded in the execution audit log.
pub const AUDIT_FUNCTION_NAME: &str = "intelligent-message-router";

const INTERACTIVE_CONFIDENCE: f64 = 0.85;
const DRIVER_STATUS_CONFIDENCE: f64 = 0.9;
const NEW_USER_CONFIDENCE: f64 = 0.9;
const INTENT_CONFIDENCE: f64 = 0.8;
const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Decides how to answer an inbound message.
///
/// Policy, in priority order:
/// 1. open session: interactive menu picked by keyword;
/// 2. closed session: the smart router's template;
/// 3. smart router error or no opinion: local keyword fallback.
#[derive(Clone)]
pub struct RoutingEngine {
    rules: Arc<RoutingRules>,
    smart_router: Arc<dyn SmartRouter>,
    database: Database,
}

impl RoutingEngine {
    pub fn new(
        rules: Arc<RoutingRules>,
        smart_router: Arc<dyn SmartRouter>,
        database: Database,
    ) -> Self {
        Self {
            rules,
            smart_router,
            database,
        }
    }

    pub fn rules(&self) -> &RoutingRules {
        &self.rules
    }

    /// Decide the routing for a message and record it in the audit log.
    ///
    /// Never fails: smart router errors fall back to keywords and audit
    /// failures are only logged.
    pub async fn determine_routing(&self, context: &MessageContext) -> RoutingDecision {
        let started = Instant::now();
        let decision = self.decide(context).await;

        info!(
            phone = %context.phone,
            user_type = context.user_type.as_str(),
            session_active = context.session_active,
            "Routing decision: {}",
            decision.description()
        );

        self.audit(context, &decision, started).await;
        decision
    }

    async fn decide(&self, context: &MessageContext) -> RoutingDecision {
        if context.session_active {
            return self.interactive(&context.message);
        }

        match self.smart_router.route(context).await {
            Ok(Some(routing)) => match routing.into_decision() {
                Some(decision) => return decision,
                None => warn!("Smart router returned a template routing without a template"),
            },
            Ok(None) => debug!("Smart router had no opinion, using keyword fallback"),
            Err(e) => warn!(error = %e, "Smart router failed, using keyword fallback"),
        }

        keyword_fallback(&self.rules, context)
    }

    fn interactive(&self, message: &str) -> RoutingDecision {
        let lower = message.to_lowercase();
        let matched = self
            .rules
            .interactive_routes
            .iter()
            .find(|route| !route.matches(&lower).is_empty());

        match matched {
            Some(route) => RoutingDecision::interactive(
                route.target.clone(),
                INTERACTIVE_CONFIDENCE,
                format!("Session active: {} menu", route.name),
            ),
            None => RoutingDecision::interactive(
                self.rules.default_interactive_payload.clone(),
                INTERACTIVE_CONFIDENCE,
                "Session active: main menu",
            ),
        }
    }

    async fn audit(&self, context: &MessageContext, decision: &RoutingDecision, started: Instant) {
        let input = json!({
            "message": context.message,
            "phone": context.phone,
            "context": {
                "userType": context.user_type,
                "sessionActive": context.session_active,
                "conversationCount": context.conversation_count,
                "preferredLanguage": context.preferred_language,
            },
        });
        let output = match serde_json::to_value(decision) {
            Ok(value) => value,
            Err(e) => json!({ "error": e.to_string() }),
        };

        if let Err(e) = execution_log::insert_log(
            self.database.pool(),
            context.user_id.as_deref(),
            AUDIT_FUNCTION_NAME,
            &input,
            &output,
            true,
            started.elapsed().as_millis() as i64,
        )
        .await
        {
            warn!(error = %e, "Failed to write routing audit row");
        }
    }
}

/// Local keyword policy used when the smart router is unavailable.
pub fn keyword_fallback(rules: &RoutingRules, context: &MessageContext) -> RoutingDecision {
    let lower = context.message.to_lowercase();

    if context.is_driver()
        && rules
            .driver_status_keywords
            .iter()
            .any(|keyword| lower.contains(keyword.as_str()))
    {
        return RoutingDecision::template(
            rules.driver_status_template.clone(),
            DRIVER_STATUS_CONFIDENCE,
            "Driver status request",
        );
    }

    if context.conversation_count == 0 {
        return RoutingDecision::template(
            rules.welcome_template.clone(),
            NEW_USER_CONFIDENCE,
            "New user welcome",
        );
    }

    for route in &rules.intent_routes {
        let hits = route.matches(&lower);
        if !hits.is_empty() {
            return RoutingDecision::template(
                route.target.clone(),
                INTENT_CONFIDENCE,
                format!("Keyword intent: {} ({})", route.name, hits.join(", ")),
            )
            .with_fallbacks(vec![rules.welcome_template.clone()]);
        }
    }

    RoutingDecision::template(
        rules.welcome_template.clone(),
        DEFAULT_CONFIDENCE,
        "Default welcome",
    )
    .with_fallbacks(vec![
        rules.main_menu_template.clone(),
        rules.support_template.clone(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserType;
    use crate::decision::{RoutingAction, SmartRouting};
    use crate::error::RouterError;
    use crate::smart::DomainScoringRouter;
    use async_trait::async_trait;

    struct FailingRouter;

    #[async_trait]
    impl SmartRouter for FailingRouter {
        async fn route(
            &self,
            _context: &MessageContext,
        ) -> Result<Option<SmartRouting>, RouterError> {
            Err(RouterError::SmartRouter("connection refused".to_string()))
        }
    }

    struct FixedRouter(SmartRouting);

    #[async_trait]
    impl SmartRouter for FixedRouter {
        async fn route(
            &self,
            _context: &MessageContext,
        ) -> Result<Option<SmartRouting>, RouterError> {
            Ok(Some(self.0.clone()))
        }
    }

    async fn engine_with(router: Arc<dyn SmartRouter>) -> RoutingEngine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        RoutingEngine::new(Arc::new(RoutingRules::default()), router, db)
    }

    fn context(message: &str, user_type: UserType, count: i64, session: bool) -> MessageContext {
        let mut context = MessageContext::new_user(message, "+250788000001");
        context.user_type = user_type;
        context.conversation_count = count;
        context.session_active = session;
        context
    }

    #[tokio::test]
    async fn test_session_active_is_interactive() {
        let engine = engine_with(Arc::new(FailingRouter)).await;

        let decision = engine
            .determine_routing(&context("I need a taxi", UserType::Returning, 4, true))
            .await;
        assert_eq!(decision.action, RoutingAction::Interactive);
        assert_eq!(decision.interactive_payload.as_deref(), Some("RIDE_MENU"));
        assert_eq!(decision.confidence, 0.85);

        let decision = engine
            .determine_routing(&context("hello", UserType::New, 0, true))
            .await;
        assert_eq!(decision.interactive_payload.as_deref(), Some("MAIN_MENU"));
        assert_eq!(decision.confidence, 0.85);
    }

    #[tokio::test]
    async fn test_smart_routing_passed_through() {
        let routing = SmartRouting {
            action: None,
            template_name: Some("tpl_vehicle_listing_v1".to_string()),
            confidence: 0.61,
            reasoning: "remote".to_string(),
            domain: Some("vehicle".to_string()),
            fallback_templates: vec!["tpl_vehicle_quick_v1".to_string()],
            metadata: None,
        };
        let engine = engine_with(Arc::new(FixedRouter(routing))).await;

        let decision = engine
            .determine_routing(&context("sell my car", UserType::Returning, 2, false))
            .await;

        assert_eq!(decision.template_name.as_deref(), Some("tpl_vehicle_listing_v1"));
        assert_eq!(decision.confidence, 0.61);
        assert_eq!(decision.reasoning, "remote");
        assert_eq!(
            decision.fallback_templates,
            Some(vec!["tpl_vehicle_quick_v1".to_string()])
        );
    }

    #[tokio::test]
    async fn test_failing_router_falls_back_to_keywords() {
        let engine = engine_with(Arc::new(FailingRouter)).await;

        let decision = engine
            .determine_routing(&context("I want to pay", UserType::Returning, 3, false))
            .await;

        assert_eq!(decision.action, RoutingAction::Template);
        assert_eq!(decision.template_name.as_deref(), Some("tpl_payments_quick_v1"));
        assert_eq!(decision.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_new_user_gets_welcome_regardless_of_content() {
        let engine = engine_with(Arc::new(FailingRouter)).await;

        let decision = engine
            .determine_routing(&context("pay rent for my house", UserType::New, 0, false))
            .await;

        assert_eq!(decision.template_name.as_deref(), Some("tpl_welcome_quick_v1"));
        assert_eq!(decision.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_decision_is_audited() {
        let engine = engine_with(Arc::new(FailingRouter)).await;
        let mut ctx = context("hello there", UserType::Returning, 5, false);
        ctx.user_id = Some("user-1".to_string());

        let decision = engine.determine_routing(&ctx).await;
        assert_eq!(decision.confidence, 0.5);

        let rows = execution_log::list_for_function(engine.database.pool(), AUDIT_FUNCTION_NAME, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id.as_deref(), Some("user-1"));
        assert_eq!(rows[0].input_data.0["message"], "hello there");
        assert_eq!(rows[0].output_data.0["templateName"], "tpl_welcome_quick_v1");
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_change_decision() {
        let engine = engine_with(Arc::new(FailingRouter)).await;
        engine.database.close().await;

        let decision = engine
            .determine_routing(&context("help me", UserType::Returning, 2, false))
            .await;

        assert_eq!(decision.template_name.as_deref(), Some("tpl_support_quick_v1"));
    }

    #[tokio::test]
    async fn test_domain_router_with_fallback() {
        let rules = Arc::new(RoutingRules::default());
        let engine = engine_with(Arc::new(DomainScoringRouter::new(rules))).await;

        let decision = engine
            .determine_routing(&context("looking for an apartment", UserType::Returning, 2, false))
            .await;
        assert_eq!(decision.template_name.as_deref(), Some("tpl_property_quick_v1"));

        let decision = engine
            .determine_routing(&context("good evening", UserType::Returning, 2, false))
            .await;
        assert_eq!(decision.template_name.as_deref(), Some("tpl_welcome_quick_v1"));
        assert_eq!(decision.confidence, 0.5);
    }

    #[test]
    fn test_keyword_fallback_driver_status() {
        let rules = RoutingRules::default();

        let decision = keyword_fallback(&rules, &context("I am online", UserType::Driver, 0, false));
        assert_eq!(decision.template_name.as_deref(), Some("tpl_driver_status_v1"));
        assert_eq!(decision.confidence, 0.9);

        // Non-drivers asking about status go through the usual order.
        let decision =
            keyword_fallback(&rules, &context("payment status", UserType::Returning, 1, false));
        assert_eq!(decision.template_name.as_deref(), Some("tpl_payments_quick_v1"));
    }

    #[test]
    fn test_keyword_fallback_intent_order() {
        let rules = RoutingRules::default();

        // "car" (vehicle) and "help" (support): vehicle comes first.
        let decision = keyword_fallback(
            &rules,
            &context("help me sell my car", UserType::Returning, 1, false),
        );
        assert_eq!(decision.template_name.as_deref(), Some("tpl_vehicle_quick_v1"));
    }
}
