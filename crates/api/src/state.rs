//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use memory_writer::{
    DigestSummarizer, Extractor, HttpSummarizer, HttpSummarizerConfig, MemoryWriter,
    RetentionPolicy, Summarizer,
};
use message_router::{
    ContextLoader, DomainScoringRouter, HttpSmartRouter, HttpSmartRouterConfig, RoutingEngine,
    RoutingRules, SmartRouter,
};
use predictive_response::PredictiveEngine;
use template_manager::{
    HttpResponseSender, HttpResponseSenderConfig, LoggingSender, ProviderSender, TemplateManager,
};
use tracing::info;

use crate::config::Config;
use crate::error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub context_loader: ContextLoader,
    pub routing: RoutingEngine,
    pub memory: MemoryWriter,
    pub predictive: PredictiveEngine,
    pub templates: TemplateManager,
}

/// The seams that can be served locally or by remote functions.
struct Seams {
    smart_router: Arc<dyn SmartRouter>,
    summarizer: Arc<dyn Summarizer>,
    sender: Arc<dyn ProviderSender>,
}

impl AppState {
    /// Build state from configuration. Remote functions are used when
    /// `FUNCTIONS_BASE_URL` is set, built-in implementations otherwise.
    pub fn from_config(db: Database, config: &Config) -> Result<Self, ApiError> {
        let rules = Arc::new(RoutingRules::default());

        let seams = match (
            config.function_url("smart-template-router"),
            config.function_url("conversation-summarizer"),
            config.function_url("response-sender"),
        ) {
            (Some(router_url), Some(summarizer_url), Some(sender_url)) => {
                info!(router_url = %router_url, "Using remote functions");
                Seams {
                    smart_router: Arc::new(
                        HttpSmartRouter::new(HttpSmartRouterConfig {
                            url: router_url,
                            auth_token: config.functions_auth_token.clone(),
                            timeout: config.downstream_timeout,
                        })
                        .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                    summarizer: Arc::new(
                        HttpSummarizer::new(HttpSummarizerConfig {
                            url: summarizer_url,
                            auth_token: config.functions_auth_token.clone(),
                            timeout: config.downstream_timeout,
                        })
                        .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                    sender: Arc::new(
                        HttpResponseSender::new(HttpResponseSenderConfig {
                            url: sender_url,
                            auth_token: config.functions_auth_token.clone(),
                            timeout: config.downstream_timeout,
                        })
                        .map_err(|e| ApiError::Internal(e.to_string()))?,
                    ),
                }
            }
            _ => {
                info!("FUNCTIONS_BASE_URL not set, using built-in router, summarizer and sender");
                Seams::local(rules.clone())
            }
        };

        Self::assemble(
            db,
            rules,
            seams,
            chrono::Duration::hours(config.session_window_hours),
            config.retention.clone(),
        )
    }

    /// State with built-in implementations for every seam.
    pub fn local(db: Database) -> Result<Self, ApiError> {
        let rules = Arc::new(RoutingRules::default());
        let seams = Seams::local(rules.clone());
        Self::assemble(
            db,
            rules,
            seams,
            chrono::Duration::hours(message_router::DEFAULT_SESSION_WINDOW_HOURS),
            RetentionPolicy::default(),
        )
    }

    fn assemble(
        db: Database,
        rules: Arc<RoutingRules>,
        seams: Seams,
        session_window: chrono::Duration,
        retention: RetentionPolicy,
    ) -> Result<Self, ApiError> {
        let extractor = Extractor::new().map_err(|e| ApiError::Internal(e.to_string()))?;

        Ok(Self {
            context_loader: ContextLoader::with_session_window(db.clone(), session_window),
            routing: RoutingEngine::new(rules, seams.smart_router, db.clone()),
            memory: MemoryWriter::new(
                db.clone(),
                Arc::new(extractor),
                seams.summarizer,
                retention,
            ),
            predictive: PredictiveEngine::new(db.clone()),
            templates: TemplateManager::new(db, seams.sender)?,
        })
    }
}

impl Seams {
    fn local(rules: Arc<RoutingRules>) -> Self {
        Self {
            smart_router: Arc::new(DomainScoringRouter::new(rules)),
            summarizer: Arc::new(DigestSummarizer::default()),
            sender: Arc::new(LoggingSender),
        }
    }
}
