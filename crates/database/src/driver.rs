//! Driver status lookups.
//!
//! Driver rows are maintained by the driver app's status updates. The
//! routing services only read them.

use sqlx::SqlitePool;

use crate::models::Driver;
use crate::Result;

/// Create or update a driver's status and location.
pub async fn upsert_driver(
    pool: &SqlitePool,
    phone_number: &str,
    status: &str,
    location: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO drivers (phone_number, status, location)
        VALUES (?, ?, ?)
        ON CONFLICT(phone_number) DO UPDATE SET
            status = excluded.status,
            location = excluded.location,
            updated_at = datetime('now')
        "#,
    )
    .bind(phone_number)
    .bind(status)
    .bind(location)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a driver by phone number.
pub async fn get_driver(pool: &SqlitePool, phone_number: &str) -> Result<Option<Driver>> {
    let record = sqlx::query_as::<_, Driver>(
        r#"
        SELECT phone_number, status, location, updated_at
        FROM drivers
        WHERE phone_number = ?
        "#,
    )
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}
