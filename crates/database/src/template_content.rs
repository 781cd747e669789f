//! Ordered components and buttons of a template version.

use sqlx::SqlitePool;

use crate::models::{NewButton, NewComponent, TemplateButton, TemplateComponent};
use crate::Result;

/// Insert the components of a version. Missing positions follow list order.
pub async fn insert_components(
    pool: &SqlitePool,
    version_id: &str,
    components: &[NewComponent],
) -> Result<()> {
    for (index, component) in components.iter().enumerate() {
        let position = component.position.unwrap_or(index as i64 + 1);
        sqlx::query(
            r#"
            INSERT INTO whatsapp_template_components
                (version_id, component_type, text, format, position)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(version_id)
        .bind(&component.component_type)
        .bind(&component.text)
        .bind(&component.format)
        .bind(position)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Insert the buttons of a version. Missing positions follow list order.
pub async fn insert_buttons(pool: &SqlitePool, version_id: &str, buttons: &[NewButton]) -> Result<()> {
    for (index, button) in buttons.iter().enumerate() {
        let position = button.position.unwrap_or(index as i64 + 1);
        sqlx::query(
            r#"
            INSERT INTO whatsapp_template_buttons
                (version_id, btn_type, text, url, phone_number, payload_key, position)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(version_id)
        .bind(&button.btn_type)
        .bind(&button.text)
        .bind(&button.url)
        .bind(&button.phone_number)
        .bind(&button.payload_key)
        .bind(position)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// List the components of a version in send order.
pub async fn list_components(pool: &SqlitePool, version_id: &str) -> Result<Vec<TemplateComponent>> {
    let rows = sqlx::query_as::<_, TemplateComponent>(
        r#"
        SELECT id, version_id, component_type, text, format, position
        FROM whatsapp_template_components
        WHERE version_id = ?
        ORDER BY position ASC, id ASC
        "#,
    )
    .bind(version_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// List the buttons of a version in display order.
pub async fn list_buttons(pool: &SqlitePool, version_id: &str) -> Result<Vec<TemplateButton>> {
    let rows = sqlx::query_as::<_, TemplateButton>(
        r#"
        SELECT id, version_id, btn_type, text, url, phone_number, payload_key, position
        FROM whatsapp_template_buttons
        WHERE version_id = ?
        ORDER BY position ASC, id ASC
        "#,
    )
    .bind(version_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
