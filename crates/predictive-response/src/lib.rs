//! Predicts how a WhatsApp conversation is likely to continue.
//!
//! A bag-of-words scorer assigns sentiment, a conversation stage and an
//! engagement weight, then looks up likely responses, objections and a
//! recommended approach for that stage. Known user types (`driver`,
//! `bar_owner`, `vendor`) get their own phrasing.
//!
//! This is not a trained model. The numbers are useful for ranking and
//! dashboards, not as probabilities.

pub mod engine;
pub mod error;
pub mod lexicon;
pub mod playbook;

pub use engine::{
    score, BehaviorPatterns, HistoryTurn, Prediction, PredictionOutcome, PredictionRequest,
    PredictiveEngine, UserContext, AUDIT_FUNCTION_NAME,
};
pub use error::PredictionError;
pub use playbook::ConversationStage;
