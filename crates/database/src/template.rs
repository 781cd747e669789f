//! Template and template version persistence.
//!
//! Versions are never rewritten: new content always lands in a new row with
//! the next per-template `version` number. Only the review `status` of a
//! version may change after insert.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Template, TemplateStatus, TemplateVersion};

/// Fields for a new template version.
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    pub id: &'a str,
    pub template_id: &'a str,
    pub language: &'a str,
    pub meta_name: Option<&'a str>,
    pub category: &'a str,
    pub status: TemplateStatus,
    pub sample_json: &'a Value,
}

/// Create a new template.
pub async fn insert_template(
    pool: &SqlitePool,
    id: &str,
    code: &str,
    domain: &str,
    intent_ids: &[String],
    description: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO whatsapp_templates (id, code, domain, intent_ids, description, is_active)
        VALUES (?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(id)
    .bind(code)
    .bind(domain)
    .bind(Json(intent_ids))
    .bind(description)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "Template", code))?;

    Ok(())
}

/// Get a template by ID.
pub async fn get_template(pool: &SqlitePool, id: &str) -> Result<Template> {
    sqlx::query_as::<_, Template>(
        r#"
        SELECT id, code, domain, intent_ids, description, is_active, created_at, updated_at
        FROM whatsapp_templates
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Template",
        id: id.to_string(),
    })
}

/// List templates, newest first.
pub async fn list_templates(pool: &SqlitePool, include_inactive: bool) -> Result<Vec<Template>> {
    let rows = sqlx::query_as::<_, Template>(
        r#"
        SELECT id, code, domain, intent_ids, description, is_active, created_at, updated_at
        FROM whatsapp_templates
        WHERE is_active = 1 OR ?
        ORDER BY created_at DESC, code ASC
        "#,
    )
    .bind(include_inactive)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Find the active template bound to an intent id.
pub async fn find_active_by_intent(pool: &SqlitePool, intent: &str) -> Result<Option<Template>> {
    let record = sqlx::query_as::<_, Template>(
        r#"
        SELECT id, code, domain, intent_ids, description, is_active, created_at, updated_at
        FROM whatsapp_templates
        WHERE is_active = 1
          AND EXISTS (SELECT 1 FROM json_each(whatsapp_templates.intent_ids) WHERE value = ?)
        ORDER BY created_at DESC, code ASC
        LIMIT 1
        "#,
    )
    .bind(intent)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Update template-level metadata. `None` fields are left unchanged.
pub async fn update_template_metadata(
    pool: &SqlitePool,
    id: &str,
    description: Option<&str>,
    intent_ids: Option<&[String]>,
    is_active: Option<bool>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE whatsapp_templates
        SET description = COALESCE(?, description),
            intent_ids = COALESCE(?, intent_ids),
            is_active = COALESCE(?, is_active),
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(description)
    .bind(intent_ids.map(Json))
    .bind(is_active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Template",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Insert a new version with the next version number for its template.
pub async fn insert_version(pool: &SqlitePool, version: &NewVersion<'_>) -> Result<TemplateVersion> {
    sqlx::query(
        r#"
        INSERT INTO whatsapp_template_versions
            (id, template_id, version, language, meta_name, category, status, sample_json)
        SELECT ?, ?, COALESCE(MAX(version), 0) + 1, ?, ?, ?, ?, ?
        FROM whatsapp_template_versions
        WHERE template_id = ?
        "#,
    )
    .bind(version.id)
    .bind(version.template_id)
    .bind(version.language)
    .bind(version.meta_name)
    .bind(version.category)
    .bind(version.status.as_str())
    .bind(Json(version.sample_json))
    .bind(version.template_id)
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::from_insert(e, "TemplateVersion", version.id))?;

    get_version(pool, version.id).await
}

/// Get a template version by ID.
pub async fn get_version(pool: &SqlitePool, id: &str) -> Result<TemplateVersion> {
    sqlx::query_as::<_, TemplateVersion>(
        r#"
        SELECT id, template_id, version, language, meta_name, category, status,
               sample_json, created_at
        FROM whatsapp_template_versions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "TemplateVersion",
        id: id.to_string(),
    })
}

/// List all versions of a template, oldest first.
pub async fn list_versions(pool: &SqlitePool, template_id: &str) -> Result<Vec<TemplateVersion>> {
    let rows = sqlx::query_as::<_, TemplateVersion>(
        r#"
        SELECT id, template_id, version, language, meta_name, category, status,
               sample_json, created_at
        FROM whatsapp_template_versions
        WHERE template_id = ?
        ORDER BY version ASC
        "#,
    )
    .bind(template_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Get the highest-numbered version of a template regardless of status.
pub async fn latest_version(pool: &SqlitePool, template_id: &str) -> Result<Option<TemplateVersion>> {
    let record = sqlx::query_as::<_, TemplateVersion>(
        r#"
        SELECT id, template_id, version, language, meta_name, category, status,
               sample_json, created_at
        FROM whatsapp_template_versions
        WHERE template_id = ?
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(template_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Get the highest-numbered approved version, optionally restricted to a language.
pub async fn latest_approved_version(
    pool: &SqlitePool,
    template_id: &str,
    language: Option<&str>,
) -> Result<Option<TemplateVersion>> {
    let record = sqlx::query_as::<_, TemplateVersion>(
        r#"
        SELECT id, template_id, version, language, meta_name, category, status,
               sample_json, created_at
        FROM whatsapp_template_versions
        WHERE template_id = ?
          AND status = ?
          AND (? IS NULL OR language = ?)
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(template_id)
    .bind(TemplateStatus::Approved.as_str())
    .bind(language)
    .bind(language)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Record the review outcome of a version.
///
/// Writes any status. Callers enforce [`TemplateStatus::can_transition_to`].
pub async fn set_version_status(pool: &SqlitePool, id: &str, status: TemplateStatus) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE whatsapp_template_versions
        SET status = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "TemplateVersion",
            id: id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use serde_json::json;

    async fn seed(pool: &SqlitePool) {
        insert_template(
            pool,
            "t1",
            "tpl_payments_quick_v1",
            "payment",
            &["pay_qr".to_string()],
            Some("Payments"),
        )
        .await
        .unwrap();
    }

    fn version<'a>(id: &'a str, language: &'a str, status: TemplateStatus, sample: &'a Value) -> NewVersion<'a> {
        NewVersion {
            id,
            template_id: "t1",
            language,
            meta_name: None,
            category: "UTILITY",
            status,
            sample_json: sample,
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        seed(db.pool()).await;

        let result =
            insert_template(db.pool(), "t2", "tpl_payments_quick_v1", "payment", &[], None).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_version_numbers_are_monotonic() {
        let db = test_db().await;
        seed(db.pool()).await;
        let sample = json!({});

        let v1 = insert_version(db.pool(), &version("v1", "en", TemplateStatus::Approved, &sample))
            .await
            .unwrap();
        let v2 = insert_version(db.pool(), &version("v2", "fr", TemplateStatus::Draft, &sample))
            .await
            .unwrap();

        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);
        assert_eq!(latest_version(db.pool(), "t1").await.unwrap().unwrap().id, "v2");
    }

    #[tokio::test]
    async fn test_latest_approved_respects_language() {
        let db = test_db().await;
        seed(db.pool()).await;
        let sample = json!({});

        insert_version(db.pool(), &version("v1", "en", TemplateStatus::Approved, &sample))
            .await
            .unwrap();
        insert_version(db.pool(), &version("v2", "fr", TemplateStatus::Draft, &sample))
            .await
            .unwrap();
        insert_version(db.pool(), &version("v3", "en", TemplateStatus::Approved, &sample))
            .await
            .unwrap();

        let any = latest_approved_version(db.pool(), "t1", None).await.unwrap().unwrap();
        assert_eq!(any.id, "v3");

        let fr = latest_approved_version(db.pool(), "t1", Some("fr")).await.unwrap();
        assert!(fr.is_none());

        set_version_status(db.pool(), "v2", TemplateStatus::Approved).await.unwrap();
        let fr = latest_approved_version(db.pool(), "t1", Some("fr")).await.unwrap().unwrap();
        assert_eq!(fr.id, "v2");
    }

    #[tokio::test]
    async fn test_find_by_intent_and_metadata_update() {
        let db = test_db().await;
        seed(db.pool()).await;

        let found = find_active_by_intent(db.pool(), "pay_qr").await.unwrap().unwrap();
        assert_eq!(found.code, "tpl_payments_quick_v1");
        assert!(find_active_by_intent(db.pool(), "ride").await.unwrap().is_none());

        update_template_metadata(db.pool(), "t1", None, None, Some(false)).await.unwrap();
        assert!(find_active_by_intent(db.pool(), "pay_qr").await.unwrap().is_none());

        let template = get_template(db.pool(), "t1").await.unwrap();
        assert_eq!(template.description.as_deref(), Some("Payments"));
        assert!(!template.is_active);

        assert_eq!(list_templates(db.pool(), false).await.unwrap().len(), 0);
        assert_eq!(list_templates(db.pool(), true).await.unwrap().len(), 1);
    }
}
