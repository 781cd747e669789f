//! Conversation analytics snapshots.
//!
//! Snapshots are produced by the analytics job, not by the routing
//! services, which only read the latest row per phone number.

use sqlx::SqlitePool;

use crate::models::ConversationAnalytics;
use crate::Result;

/// Insert an analytics snapshot for a phone number.
pub async fn insert_snapshot(
    pool: &SqlitePool,
    phone_number: &str,
    total_messages: i64,
    conversion_event: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO conversation_analytics (phone_number, total_messages, conversion_event)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(phone_number)
    .bind(total_messages)
    .bind(conversion_event)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get the most recent analytics snapshot for a phone number.
pub async fn latest_for_phone(
    pool: &SqlitePool,
    phone_number: &str,
) -> Result<Option<ConversationAnalytics>> {
    let record = sqlx::query_as::<_, ConversationAnalytics>(
        r#"
        SELECT id, phone_number, total_messages, conversion_event, created_at
        FROM conversation_analytics
        WHERE phone_number = ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_latest_snapshot_wins() {
        let db = test_db().await;
        let phone = "+250788123456";

        assert!(latest_for_phone(db.pool(), phone).await.unwrap().is_none());

        insert_snapshot(db.pool(), phone, 2, None).await.unwrap();
        insert_snapshot(db.pool(), phone, 7, Some("payment_completed")).await.unwrap();

        let latest = latest_for_phone(db.pool(), phone).await.unwrap().unwrap();
        assert_eq!(latest.total_messages, 7);
        assert_eq!(latest.conversion_event.as_deref(), Some("payment_completed"));
    }
}
