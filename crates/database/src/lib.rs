//! SQLite persistence layer for easyMO.
//!
//! This crate provides async database operations for contacts, agent memory,
//! execution audit rows and the WhatsApp template catalog using SQLx with
//! SQLite. It is the only coordination point between the request handlers.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, contact};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:easymo.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     contact::upsert_contact(db.pool(), "+250788123456", Some("Jean"), Some("rw")).await?;
//!     let found = contact::get_contact(db.pool(), "+250788123456").await?;
//!     assert!(found.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod behavior;
pub mod contact;
pub mod conversation_summary;
pub mod driver;
pub mod error;
pub mod execution_log;
pub mod memory;
pub mod models;
pub mod template;
pub mod template_content;
pub mod template_usage;

pub use error::{DatabaseError, Result};
pub use models::{
    BehaviorScore, Contact, ConversationAnalytics, ConversationSummary, Driver,
    ExecutionLogEntry, MemoryRecord, MemoryType, NewButton, NewComponent, NewMemory, NewUsage,
    Template, TemplateButton, TemplateComponent, TemplateStatus, TemplateUsage, TemplateVersion,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/easymo.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Database;

    pub async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contact_and_driver_lookup() {
        let db = test_support::test_db().await;

        contact::upsert_contact(db.pool(), "+250788000001", Some("Aline"), Some("rw"))
            .await
            .unwrap();
        driver::upsert_driver(db.pool(), "+250788000001", "online", Some("Remera"))
            .await
            .unwrap();

        let found = contact::get_contact(db.pool(), "+250788000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name.as_deref(), Some("Aline"));
        assert_eq!(found.total_conversations, 0);

        let driver = driver::get_driver(db.pool(), "+250788000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(driver.status, "online");

        assert!(contact::get_contact(db.pool(), "+250788999999")
            .await
            .unwrap()
            .is_none());
    }
}
