//! Provider sender trait and implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TemplateError;

/// Delivers rendered template text to a WhatsApp recipient.
///
/// Abstracted so the send path can be exercised without the provider.
#[async_trait]
pub trait ProviderSender: Send + Sync {
    /// Send a text message and return the provider message id.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, TemplateError>;
}

/// A sender that only logs and returns a synthetic message id.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl ProviderSender for LoggingSender {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, TemplateError> {
        info!(recipient, chars = text.chars().count(), "Would send template message");
        Ok(format!("msg_{}", Utc::now().timestamp_millis()))
    }
}

/// Settings for the remote `response-sender` function.
#[derive(Debug, Clone)]
pub struct HttpResponseSenderConfig {
    pub url: String,
    pub auth_token: Option<String>,
    /// Request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    phone: &'a str,
    message: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default, alias = "messageId")]
    message_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Sender backed by the remote `response-sender` function.
pub struct HttpResponseSender {
    client: Client,
    config: HttpResponseSenderConfig,
}

impl HttpResponseSender {
    pub fn new(config: HttpResponseSenderConfig) -> Result<Self, TemplateError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            TemplateError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl ProviderSender for HttpResponseSender {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, TemplateError> {
        let request = SendRequest {
            phone: recipient,
            message: text,
            kind: "text",
        };

        let mut call = self.client.post(&self.config.url).json(&request);
        if let Some(token) = &self.config.auth_token {
            call = call.header("Authorization", format!("Bearer {}", token));
        }

        let response = call
            .send()
            .await
            .map_err(|e| TemplateError::Provider(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TemplateError::Provider(format!(
                "response-sender error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| TemplateError::Provider(format!("Failed to parse response: {}", e)))?;

        body.message_id.ok_or_else(|| {
            TemplateError::Provider(
                body.error
                    .unwrap_or_else(|| "response had no message id".to_string()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logging_sender_returns_synthetic_id() {
        let id = LoggingSender.send_text("+250788000001", "hello").await.unwrap();
        assert!(id.starts_with("msg_"));
    }
}
