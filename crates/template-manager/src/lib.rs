//! WhatsApp template catalog.
//!
//! Templates are versioned: every edit inserts a new version and review
//! status is tracked per version. Sending always picks the highest approved
//! version (optionally in a given language), renders its components with
//! `{{placeholder}}` substitution and hands the text to a [`ProviderSender`].
//! Each send attempt, successful or not, is written to the usage log.

pub mod error;
pub mod manager;
pub mod render;
pub mod sender;

pub use error::TemplateError;
pub use manager::{
    IntentTemplate, NewTemplate, SendReceipt, SendTemplate, TemplateDetail, TemplateManager,
    TemplateSummary, TemplateUpdate, VersionDetail, FALLBACK_TEXT,
};
pub use render::Renderer;
pub use sender::{HttpResponseSender, HttpResponseSenderConfig, LoggingSender, ProviderSender};
