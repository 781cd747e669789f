//! Error types for memory processing.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while extracting or persisting memories.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Memory, summary or audit query failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// An extraction pattern failed to compile.
    #[error("invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The summarizer call failed.
    #[error("summarizer failed: {0}")]
    Summarizer(String),

    /// Client construction or configuration failed.
    #[error("configuration error: {0}")]
    Configuration(String),
}
