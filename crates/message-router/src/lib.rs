//! Inbound WhatsApp message routing for easyMO.
//!
//! Routing has two stages: load what we know about the sender, then decide
//! whether to answer with an interactive menu, a pre-approved template or an
//! agent handoff.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌────────────────┐
//! │   message    │──▶│ ContextLoader │──▶│ RoutingEngine  │
//! │ phone, user  │   │ contacts,     │   │ session open?  │
//! └──────────────┘   │ drivers,      │   │  └▶ interactive│
//!                    │ analytics     │   │ SmartRouter    │
//!                    └───────────────┘   │  └▶ template   │
//!                                        │ keyword rules  │
//!                                        │  └▶ fallback   │
//!                                        └───────┬────────┘
//!                                                ▼
//!                                      agent_execution_log
//! ```
//!
//! WhatsApp only allows free-form and interactive replies within 24 hours of
//! the user's last message, which is why the session flag comes first.

pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod rules;
pub mod smart;

pub use context::{ContextLoader, MessageContext, UserType, DEFAULT_SESSION_WINDOW_HOURS};
pub use decision::{RoutingAction, RoutingDecision, SmartRouting, WELCOME_TEMPLATE};
pub use engine::{keyword_fallback, RoutingEngine, AUDIT_FUNCTION_NAME};
pub use error::RouterError;
pub use rules::{DomainRule, KeywordRoute, RoutingRules};
pub use smart::{DomainScoringRouter, HttpSmartRouter, HttpSmartRouterConfig, SmartRouter};
