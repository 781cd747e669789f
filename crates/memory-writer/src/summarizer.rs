//! Conversation summarizer seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MemoryError;

/// Token budget requested from the remote summarizer.
pub const SUMMARY_MAX_TOKENS: u32 = 200;

/// Input for one summarization call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    /// Recent turns in chronological order, separated by blank lines.
    pub conversation_text: String,
    pub user_id: String,
    pub domain: String,
    pub max_tokens: u32,
}

/// Produces a short summary of recent conversation turns.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, MemoryError>;
}

/// Settings for the remote `conversation-summarizer` function.
#[derive(Debug, Clone)]
pub struct HttpSummarizerConfig {
    pub url: String,
    pub auth_token: Option<String>,
    /// Request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Summarizer backed by the remote `conversation-summarizer` function.
pub struct HttpSummarizer {
    client: Client,
    config: HttpSummarizerConfig,
}

impl HttpSummarizer {
    pub fn new(config: HttpSummarizerConfig) -> Result<Self, MemoryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            MemoryError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, MemoryError> {
        let mut call = self.client.post(&self.config.url).json(request);
        if let Some(token) = &self.config.auth_token {
            call = call.header("Authorization", format!("Bearer {}", token));
        }

        let response = call
            .send()
            .await
            .map_err(|e| MemoryError::Summarizer(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MemoryError::Summarizer(format!(
                "conversation-summarizer error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: SummaryResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::Summarizer(format!("Failed to parse response: {}", e)))?;

        match body.summary {
            Some(summary) => {
                debug!(chars = summary.len(), "Received conversation summary");
                Ok(summary)
            }
            None => Err(MemoryError::Summarizer(
                body.error
                    .unwrap_or_else(|| "response had no summary".to_string()),
            )),
        }
    }
}

/// Local summarizer that keeps a bounded digest of the most recent turns.
#[derive(Debug, Clone)]
pub struct DigestSummarizer {
    pub max_entries: usize,
    pub max_entry_chars: usize,
    pub max_summary_chars: usize,
}

impl Default for DigestSummarizer {
    fn default() -> Self {
        Self {
            max_entries: 10,
            max_entry_chars: 160,
            max_summary_chars: 1200,
        }
    }
}

impl DigestSummarizer {
    /// Build the digest for a conversation text.
    pub fn digest(&self, conversation_text: &str) -> String {
        let mut entries: Vec<String> = conversation_text
            .split("\n\n")
            .map(collapse_lines)
            .filter(|entry| !entry.is_empty())
            .map(|entry| truncate_text(&entry, self.max_entry_chars))
            .collect();

        if self.max_entries > 0 && entries.len() > self.max_entries {
            let trim = entries.len() - self.max_entries;
            entries.drain(0..trim);
        }

        let mut summary = entries.join("\n");
        if self.max_summary_chars > 0 {
            while summary.chars().count() > self.max_summary_chars && entries.len() > 1 {
                entries.remove(0);
                summary = entries.join("\n");
            }
            if summary.chars().count() > self.max_summary_chars {
                summary = truncate_text(&summary, self.max_summary_chars);
            }
        }

        summary
    }
}

#[async_trait]
impl Summarizer for DigestSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, MemoryError> {
        Ok(self.digest(&request.conversation_text))
    }
}

fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let ellipsis = "...";
    let available = max_chars.saturating_sub(ellipsis.len());
    if available == 0 {
        return text.chars().take(max_chars).collect();
    }
    let mut output: String = text.chars().take(available).collect();
    output.push_str(ellipsis);
    output
}
