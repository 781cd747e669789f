//! Error types for template operations.

use database::DatabaseError;
use thiserror::Error;

/// Errors that can occur while managing or sending templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Catalog or usage log query failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The template has no version with status APPROVED (in the requested language).
    #[error("No approved template version found")]
    NoApprovedVersion,

    /// The request is missing or has an invalid field.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The provider rejected or failed the delivery.
    #[error("provider send failed: {0}")]
    Provider(String),

    /// A placeholder pattern failed to compile.
    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Client construction or configuration failed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TemplateError {
    /// Whether the error means a template or version does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplateError::Database(DatabaseError::NotFound { .. }))
    }
}
