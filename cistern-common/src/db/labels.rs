//! Free-text labels (sub-project names, among others)

use anyhow::Result;
use sqlx::SqliteExecutor;

/// Insert a label if it does not already exist
pub async fn insert_label(executor: impl SqliteExecutor<'_>, text: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO labels (text) VALUES (?)")
        .bind(text)
        .execute(executor)
        .await?;
    Ok(())
}

/// Resolve label text to an id
pub async fn find_label_id(
    executor: impl SqliteExecutor<'_>,
    text: &str,
) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM labels WHERE text = ?")
        .bind(text)
        .fetch_optional(executor)
        .await?;
    Ok(id)
}
