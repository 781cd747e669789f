//! Conversation summary persistence.
//!
//! Summaries are keyed by user, not by conversation id: webhook callers do
//! not always send a conversation id, and the summary window spans the
//! user's most recent turns across conversations. Each write replaces the
//! previous summary.

use sqlx::SqlitePool;

use crate::models::ConversationSummary;
use crate::Result;

/// Create or update the conversation summary for a user.
pub async fn upsert_summary(
    pool: &SqlitePool,
    user_id: &str,
    summary: &str,
    turn_count: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversation_summaries (user_id, summary, turn_count)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            summary = excluded.summary,
            turn_count = excluded.turn_count,
            updated_at = datetime('now')
        "#,
    )
    .bind(user_id)
    .bind(summary)
    .bind(turn_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the conversation summary for a user.
pub async fn get_summary(pool: &SqlitePool, user_id: &str) -> Result<Option<ConversationSummary>> {
    let record = sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT user_id, summary, turn_count, updated_at
        FROM conversation_summaries
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_upsert_replaces_summary() {
        let db = test_db().await;

        upsert_summary(db.pool(), "u1", "first", 5).await.unwrap();
        upsert_summary(db.pool(), "u1", "second", 10).await.unwrap();

        let summary = get_summary(db.pool(), "u1").await.unwrap().unwrap();
        assert_eq!(summary.summary, "second");
        assert_eq!(summary.turn_count, 10);
        assert!(get_summary(db.pool(), "u2").await.unwrap().is_none());
    }
}
