//! Stored behavioral scores for the predictive engine.

use sqlx::SqlitePool;

use crate::models::BehaviorScore;
use crate::Result;

/// Get the stored behavioral score for a user.
pub async fn get_score(pool: &SqlitePool, user_id: &str) -> Result<Option<BehaviorScore>> {
    let record = sqlx::query_as::<_, BehaviorScore>(
        r#"
        SELECT user_id, engagement_score, user_type, updated_at
        FROM user_behavior_scores
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Store a behavioral score. A `None` user type keeps the existing tag.
pub async fn upsert_score(
    pool: &SqlitePool,
    user_id: &str,
    engagement_score: f64,
    user_type: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_behavior_scores (user_id, engagement_score, user_type)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            engagement_score = excluded.engagement_score,
            user_type = COALESCE(excluded.user_type, user_behavior_scores.user_type),
            updated_at = datetime('now')
        "#,
    )
    .bind(user_id)
    .bind(engagement_score)
    .bind(user_type)
    .execute(pool)
    .await?;

    Ok(())
}
