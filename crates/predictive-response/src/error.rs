//! Error types for prediction.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while predicting.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Loading or storing the behavioral score failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The request cannot be scored.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
