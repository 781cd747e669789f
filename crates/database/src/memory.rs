//! Append-only agent memory persistence.

use std::time::Duration;

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::{MemoryRecord, MemoryType, NewMemory};
use crate::Result;

/// Insert a memory row and return its id.
pub async fn insert_memory(pool: &SqlitePool, memory: &NewMemory) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO agent_memory_enhanced
            (user_id, memory_type, memory_key, memory_value, importance_weight, confidence_score)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&memory.user_id)
    .bind(memory.memory_type.as_str())
    .bind(&memory.memory_key)
    .bind(Json(&memory.memory_value))
    .bind(memory.importance_weight)
    .bind(memory.confidence_score)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get the most recent memory rows of one type for a user, newest first.
pub async fn recent_by_type(
    pool: &SqlitePool,
    user_id: &str,
    memory_type: MemoryType,
    limit: i64,
) -> Result<Vec<MemoryRecord>> {
    let rows = sqlx::query_as::<_, MemoryRecord>(
        r#"
        SELECT id, user_id, memory_type, memory_key, memory_value,
               importance_weight, confidence_score, created_at
        FROM agent_memory_enhanced
        WHERE user_id = ? AND memory_type = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(memory_type.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// List all memory rows for a user, oldest first.
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<MemoryRecord>> {
    let rows = sqlx::query_as::<_, MemoryRecord>(
        r#"
        SELECT id, user_id, memory_type, memory_key, memory_value,
               importance_weight, confidence_score, created_at
        FROM agent_memory_enhanced
        WHERE user_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count memory rows for a user grouped by memory type.
pub async fn count_by_type(pool: &SqlitePool, user_id: &str) -> Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT memory_type, COUNT(*) as count
        FROM agent_memory_enhanced
        WHERE user_id = ?
        GROUP BY memory_type
        ORDER BY memory_type
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Prune memory rows older than the specified TTL.
pub async fn prune_older_than(pool: &SqlitePool, ttl: Duration) -> Result<u64> {
    let modifier = format!("-{} seconds", ttl.as_secs());
    let result = sqlx::query(
        r#"
        DELETE FROM agent_memory_enhanced
        WHERE created_at < datetime('now', ?)
        "#,
    )
    .bind(modifier)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Prune a user's memory rows to a maximum row count, keeping the newest.
pub async fn prune_over_limit_for_user(
    pool: &SqlitePool,
    user_id: &str,
    max_rows: usize,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM agent_memory_enhanced
        WHERE id IN (
            SELECT id
            FROM agent_memory_enhanced
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT -1 OFFSET ?
        )
        "#,
    )
    .bind(user_id)
    .bind(max_rows as i64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
