//! Conversation memory for easyMO agents.
//!
//! After each completed turn the [`MemoryWriter`] stores the exchange,
//! extracts preferences and facts from the user's message with a fixed
//! [`Extractor`] rule table, and every fifth turn asks a [`Summarizer`] for a
//! short summary of the recent conversation.
//!
//! Memory rows are append-only unless a [`RetentionPolicy`] is configured.

pub mod error;
pub mod rules;
pub mod summarizer;
pub mod writer;

pub use error::MemoryError;
pub use rules::{Extracted, Extraction, ExtractionRule, Extractor, RuleKind};
pub use summarizer::{
    DigestSummarizer, HttpSummarizer, HttpSummarizerConfig, Summarizer, SummaryRequest,
    SUMMARY_MAX_TOKENS,
};
pub use writer::{
    MemoryWriter, ProcessingOutcome, ProcessingReport, RetentionPolicy, TurnInput,
    AUDIT_FUNCTION_NAME, SUMMARY_INTERVAL,
};
