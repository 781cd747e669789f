//! Audit rows written by every handler.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::ExecutionLogEntry;
use crate::Result;

/// Insert an execution log row and return its id.
pub async fn insert_log(
    pool: &SqlitePool,
    user_id: Option<&str>,
    function_name: &str,
    input_data: &Value,
    output_data: &Value,
    success: bool,
    execution_time_ms: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO agent_execution_log
            (user_id, function_name, input_data, output_data, success_status, execution_time_ms)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(function_name)
    .bind(Json(input_data))
    .bind(Json(output_data))
    .bind(success)
    .bind(execution_time_ms)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// List the most recent log rows for a function, newest first.
pub async fn list_for_function(
    pool: &SqlitePool,
    function_name: &str,
    limit: i64,
) -> Result<Vec<ExecutionLogEntry>> {
    let rows = sqlx::query_as::<_, ExecutionLogEntry>(
        r#"
        SELECT id, user_id, function_name, input_data, output_data,
               success_status, execution_time_ms, created_at
        FROM agent_execution_log
        WHERE function_name = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(function_name)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
