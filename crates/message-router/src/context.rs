//! Per-message context assembled from the contact, driver and analytics tables.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use database::{analytics, contact, driver, Database};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RouterError;

/// Default window after the last interaction during which free-form replies are allowed.
pub const DEFAULT_SESSION_WINDOW_HOURS: i64 = 24;

/// Coarse classification of the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Driver,
    New,
    Returning,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Driver => "driver",
            UserType::New => "new",
            UserType::Returning => "returning",
        }
    }
}

/// Everything the routing policy knows about an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContext {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub phone: String,
    pub session_active: bool,
    pub user_type: UserType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<String>,
    pub conversation_count: i64,
    pub preferred_language: String,
    /// Last reported driver location, when the sender is a driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl MessageContext {
    /// Context for a sender with no stored history.
    pub fn new_user(message: &str, phone: &str) -> Self {
        Self {
            message: message.to_string(),
            user_id: None,
            phone: phone.to_string(),
            session_active: false,
            user_type: UserType::New,
            last_interaction: None,
            conversation_count: 0,
            preferred_language: "en".to_string(),
            location: None,
        }
    }

    pub fn is_driver(&self) -> bool {
        self.user_type == UserType::Driver
    }
}

/// Loads [`MessageContext`] values from the database.
#[derive(Debug, Clone)]
pub struct ContextLoader {
    database: Database,
    session_window: Duration,
}

impl ContextLoader {
    /// Create a loader with the default 24 hour session window.
    pub fn new(database: Database) -> Self {
        Self::with_session_window(database, Duration::hours(DEFAULT_SESSION_WINDOW_HOURS))
    }

    pub fn with_session_window(database: Database, session_window: Duration) -> Self {
        Self {
            database,
            session_window,
        }
    }

    /// Load the context for a message.
    ///
    /// A caller-supplied `session_active` flag is used as-is; otherwise the
    /// session is active when the last interaction falls inside the window.
    pub async fn load(
        &self,
        message: &str,
        user_id: Option<&str>,
        phone: &str,
        session_active: Option<bool>,
    ) -> Result<MessageContext, RouterError> {
        self.load_at(message, user_id, phone, session_active, Utc::now())
            .await
    }

    /// Same as [`load`](Self::load) with an explicit clock.
    pub async fn load_at(
        &self,
        message: &str,
        user_id: Option<&str>,
        phone: &str,
        session_active: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<MessageContext, RouterError> {
        let pool = self.database.pool();

        let contact = contact::get_contact(pool, phone).await?;
        let driver = driver::get_driver(pool, phone).await?;
        let analytics = analytics::latest_for_phone(pool, phone).await?;

        let conversation_count = contact.as_ref().map_or(0, |c| c.total_conversations);
        let has_history = analytics.as_ref().is_some_and(|a| a.total_messages > 0);

        let user_type = if driver.is_some() {
            UserType::Driver
        } else if has_history || conversation_count > 0 {
            UserType::Returning
        } else {
            UserType::New
        };

        let last_interaction = contact.as_ref().and_then(|c| c.last_interaction.clone());
        let session_active = session_active.unwrap_or_else(|| {
            last_interaction
                .as_deref()
                .and_then(parse_timestamp)
                .is_some_and(|at| at <= now && now - at < self.session_window)
        });

        let context = MessageContext {
            message: message.to_string(),
            user_id: user_id.map(str::to_string),
            phone: phone.to_string(),
            session_active,
            user_type,
            last_interaction,
            conversation_count,
            preferred_language: contact
                .and_then(|c| c.preferred_language)
                .unwrap_or_else(|| "en".to_string()),
            location: driver.and_then(|d| d.location),
        };

        debug!(
            phone = %context.phone,
            user_type = context.user_type.as_str(),
            session_active = context.session_active,
            conversation_count = context.conversation_count,
            "Loaded message context"
        );

        Ok(context)
    }
}

/// Parse an RFC 3339 timestamp or SQLite's `datetime('now')` format (UTC).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
