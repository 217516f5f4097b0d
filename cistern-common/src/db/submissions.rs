//! Pre-registered submission records
//!
//! A record is created when a client announces an upload (checksum,
//! declared kind, owning build, original filename) and deleted once the
//! bytes parse successfully or the kind turns out to be unsupported. A
//! parse failure leaves the record in place so a corrected re-upload
//! with the same checksum can retry.

use super::models::SubmissionRecord;
use anyhow::Result;
use sqlx::SqlitePool;

/// Register a pending submission descriptor
pub async fn register_submission(
    pool: &SqlitePool,
    checksum: &str,
    kind: &str,
    build_id: i64,
    filename: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO submission_records (checksum, kind, build_id, filename)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(checksum)
    .bind(kind)
    .bind(build_id)
    .bind(filename)
    .execute(pool)
    .await?;
    Ok(())
}

/// Exact-match lookup by checksum
pub async fn find_record(pool: &SqlitePool, checksum: &str) -> Result<Option<SubmissionRecord>> {
    let record = sqlx::query_as::<_, SubmissionRecord>(
        "SELECT checksum, kind, build_id, filename FROM submission_records WHERE checksum = ?",
    )
    .bind(checksum)
    .fetch_optional(pool)
    .await?;
    Ok(record)
}

/// Remove a record (after successful parse, or when its kind has no handler)
pub async fn delete_record(pool: &SqlitePool, checksum: &str) -> Result<()> {
    sqlx::query("DELETE FROM submission_records WHERE checksum = ?")
        .bind(checksum)
        .execute(pool)
        .await?;
    Ok(())
}
