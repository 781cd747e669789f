//! Contact lookups for the context loader.
//!
//! The routing services only read this table. Rows are written by the
//! inbound WhatsApp webhook that owns the conversation lifecycle; the
//! writers here are its entry points and are used to seed tests.

use sqlx::SqlitePool;

use crate::models::Contact;
use crate::Result;

/// Create a contact or update its name and language.
pub async fn upsert_contact(
    pool: &SqlitePool,
    phone_number: &str,
    name: Option<&str>,
    preferred_language: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO contacts (phone_number, name, preferred_language)
        VALUES (?, ?, ?)
        ON CONFLICT(phone_number) DO UPDATE SET
            name = COALESCE(excluded.name, contacts.name),
            preferred_language = COALESCE(excluded.preferred_language, contacts.preferred_language)
        "#,
    )
    .bind(phone_number)
    .bind(name)
    .bind(preferred_language)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record an inbound conversation: bumps the conversation count and stamps
/// `last_interaction`. Creates the contact if needed.
pub async fn record_interaction(
    pool: &SqlitePool,
    phone_number: &str,
    interacted_at: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO contacts (phone_number, last_interaction, total_conversations)
        VALUES (?, ?, 1)
        ON CONFLICT(phone_number) DO UPDATE SET
            last_interaction = excluded.last_interaction,
            total_conversations = contacts.total_conversations + 1
        "#,
    )
    .bind(phone_number)
    .bind(interacted_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a contact by phone number.
pub async fn get_contact(pool: &SqlitePool, phone_number: &str) -> Result<Option<Contact>> {
    let record = sqlx::query_as::<_, Contact>(
        r#"
        SELECT phone_number, name, preferred_language, last_interaction,
               total_conversations, created_at
        FROM contacts
        WHERE phone_number = ?
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
    async fn test_record_interaction_counts_conversations() {
        let db = test_db().await;
        let phone = "+250788123456";

        record_interaction(db.pool(), phone, "2025-08-01T10:00:00Z").await.unwrap();
        record_interaction(db.pool(), phone, "2025-08-02T10:00:00Z").await.unwrap();

        let contact = get_contact(db.pool(), phone).await.unwrap().unwrap();
        assert_eq!(contact.total_conversations, 2);
        assert_eq!(contact.last_interaction.as_deref(), Some("2025-08-02T10:00:00Z"));
    }

    #[tokio::test]
    async fn test_upsert_keeps_existing_values() {
        let db = test_db().await;
        let phone = "+250788123456";

        upsert_contact(db.pool(), phone, Some("Jean"), Some("fr")).await.unwrap();
        upsert_contact(db.pool(), phone, None, Some("rw")).await.unwrap();

        let contact = get_contact(db.pool(), phone).await.unwrap().unwrap();
        assert_eq!(contact.name.as_deref(), Some("Jean"));
        assert_eq!(contact.preferred_language.as_deref(), Some("rw"));
    }
}
