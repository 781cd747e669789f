//! Template send log.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::models::{NewUsage, TemplateUsage};
use crate::Result;

/// Insert a usage row for one send attempt.
pub async fn insert_usage(pool: &SqlitePool, usage: &NewUsage) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO whatsapp_template_usage_log
            (template_id, version_id, recipient_phone, provider_message_id,
             latency_ms, success, error_message, context)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&usage.template_id)
    .bind(&usage.version_id)
    .bind(&usage.recipient_phone)
    .bind(&usage.provider_message_id)
    .bind(usage.latency_ms)
    .bind(usage.success)
    .bind(&usage.error_message)
    .bind(Json(&usage.context))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// List usage rows for a template, newest first.
pub async fn list_for_template(
    pool: &SqlitePool,
    template_id: &str,
    limit: i64,
) -> Result<Vec<TemplateUsage>> {
    let rows = sqlx::query_as::<_, TemplateUsage>(
        r#"
        SELECT id, template_id, version_id, recipient_phone, provider_message_id,
               latency_ms, success, error_message, context, sent_at
        FROM whatsapp_template_usage_log
        WHERE template_id = ?
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(template_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
