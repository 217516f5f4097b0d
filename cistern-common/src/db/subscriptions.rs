//! Notification subscriptions created during structure reconciliation

use anyhow::Result;
use sqlx::{SqliteExecutor, SqlitePool};

/// Default email_type for new subscriptions: any build
pub const EMAIL_TYPE_ALL_BUILDS: i64 = 3;
/// Default email_category for new subscriptions: everything except warnings
pub const EMAIL_CATEGORY_DEFAULT: i64 = 54;

/// Subscribe a user to a project with the default notification policy.
///
/// An existing subscription is left untouched: its settings are never
/// overwritten by a structure submission.
pub async fn ensure_project_subscription(
    executor: impl SqliteExecutor<'_>,
    user_id: i64,
    project_id: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO user_projects (user_id, project_id, email_type, email_category)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(project_id)
    .bind(EMAIL_TYPE_ALL_BUILDS)
    .bind(EMAIL_CATEGORY_DEFAULT)
    .execute(executor)
    .await?;
    Ok(())
}

/// Attach a label filter to a user's project subscription (idempotent)
pub async fn ensure_label_subscription(
    executor: impl SqliteExecutor<'_>,
    label_id: i64,
    user_id: i64,
    project_id: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO label_subscriptions (label_id, user_id, project_id) VALUES (?, ?, ?)",
    )
    .bind(label_id)
    .bind(user_id)
    .bind(project_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Current (email_type, email_category) of a subscription, if any
pub async fn subscription_settings(
    pool: &SqlitePool,
    user_id: i64,
    project_id: i64,
) -> Result<Option<(i64, i64)>> {
    let settings = sqlx::query_as::<_, (i64, i64)>(
        "SELECT email_type, email_category FROM user_projects WHERE user_id = ? AND project_id = ?",
    )
    .bind(user_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;
    Ok(settings)
}
