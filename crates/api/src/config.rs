//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use memory_writer::RetentionPolicy;
use message_router::DEFAULT_SESSION_WINDOW_HOURS;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Base URL of the remote functions (smart router, summarizer, sender).
    /// Built-in implementations are used when unset.
    pub functions_base_url: Option<String>,
    /// Bearer token for the remote functions.
    pub functions_auth_token: Option<String>,
    /// Inactivity window after which a session is no longer active.
    pub session_window_hours: i64,
    /// Timeout for remote function calls. `None` waits indefinitely.
    pub downstream_timeout: Option<Duration>,
    /// Optional memory retention limits.
    pub retention: RetentionPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `API_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:easymo.db?mode=rwc` |
    /// | `FUNCTIONS_BASE_URL` | Remote functions base URL | (built-in) |
    /// | `FUNCTIONS_AUTH_TOKEN` | Bearer token for remote functions | (none) |
    /// | `SESSION_WINDOW_HOURS` | Session window | `24` |
    /// | `DOWNSTREAM_TIMEOUT_SECS` | Remote call timeout | (none) |
    /// | `MEMORY_TTL_DAYS` | Drop memories older than this | (off) |
    /// | `MEMORY_MAX_ROWS_PER_USER` | Keep at most this many memories per user | (off) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("API_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:easymo.db?mode=rwc".to_string());

        let functions_base_url = non_empty("FUNCTIONS_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string());
        let functions_auth_token = non_empty("FUNCTIONS_AUTH_TOKEN");

        let session_window_hours = match non_empty("SESSION_WINDOW_HOURS") {
            Some(value) => value
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::InvalidNumber("SESSION_WINDOW_HOURS"))?,
            None => DEFAULT_SESSION_WINDOW_HOURS,
        };

        let downstream_timeout = match non_empty("DOWNSTREAM_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber("DOWNSTREAM_TIMEOUT_SECS"))?,
            )),
            None => None,
        };

        Ok(Self {
            addr,
            database_url,
            functions_base_url,
            functions_auth_token,
            session_window_hours,
            downstream_timeout,
            retention: RetentionPolicy::from_env(),
        })
    }

    /// URL of a named remote function, when remote functions are configured.
    pub fn function_url(&self, name: &str) -> Option<String> {
        self.functions_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, name))
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API_ADDR format")]
    InvalidAddr,

    #[error("{0} must be a positive number")]
    InvalidNumber(&'static str),
}
