//! User records created on demand from structure-submission emails

use anyhow::Result;
use sqlx::SqliteConnection;

/// Find an existing user by email or create one.
///
/// New users get their name split at the `@`: local part as first name,
/// domain as last name (or the whole address for both when there is no
/// `@`). No credentials are stored; account access is a separate
/// system's concern.
pub async fn find_or_create_user(conn: &mut SqliteConnection, email: &str) -> Result<i64> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let (first_name, last_name) = match email.split_once('@') {
        Some((local, domain)) => (local, domain),
        None => (email, email),
    };

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, first_name, last_name, admin) VALUES (?, ?, ?, 0) RETURNING id",
    )
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init;
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn creates_once_and_splits_names() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init::init_schema(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let id = find_or_create_user(&mut *conn, "kitware@example.com")
            .await
            .unwrap();
        let again = find_or_create_user(&mut *conn, "kitware@example.com")
            .await
            .unwrap();
        assert_eq!(id, again);

        let (first, last): (String, String) =
            sqlx::query_as("SELECT first_name, last_name FROM users WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(first, "kitware");
        assert_eq!(last, "example.com");
    }
}
