//! Error types for routing operations.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while loading context or consulting the smart router.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Context or audit query failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The smart template router call failed.
    #[error("smart router failed: {0}")]
    SmartRouter(String),

    /// The smart template router returned something unusable.
    #[error("invalid smart router response: {0}")]
    InvalidResponse(String),

    /// Client construction or configuration failed.
    #[error("configuration error: {0}")]
    Configuration(String),
}
