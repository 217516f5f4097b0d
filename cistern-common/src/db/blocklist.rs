//! Blocklist rules for rejecting submissions

use anyhow::Result;
use sqlx::SqlitePool;

/// Add a blocklist rule. Empty-string fields match any value.
pub async fn add_rule(
    pool: &SqlitePool,
    project_id: i64,
    build_name: &str,
    site_name: &str,
    ip_address: &str,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO blocked_submissions (project_id, build_name, site_name, ip_address)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(project_id)
    .bind(build_name)
    .bind(site_name)
    .bind(ip_address)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Check whether a (project, build name, site name, origin address)
/// tuple matches any blocklist rule.
pub async fn is_banned(
    pool: &SqlitePool,
    project_id: i64,
    build_name: &str,
    site_name: &str,
    ip_address: &str,
) -> Result<bool> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM blocked_submissions
        WHERE project_id = ?
          AND (build_name = '' OR build_name = ?)
          AND (site_name = '' OR site_name = ?)
          AND (ip_address = '' OR ip_address = ?)
        "#,
    )
    .bind(project_id)
    .bind(build_name)
    .bind(site_name)
    .bind(ip_address)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init, projects};

    #[tokio::test]
    async fn empty_rule_fields_match_any_value() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init::init_schema(&pool).await.unwrap();
        let project_id = projects::create_project(&pool, "ITK").await.unwrap();

        add_rule(&pool, project_id, "nightly-clang", "", "").await.unwrap();

        assert!(is_banned(&pool, project_id, "nightly-clang", "any-site", "10.0.0.1")
            .await
            .unwrap());
        assert!(!is_banned(&pool, project_id, "nightly-gcc", "any-site", "10.0.0.1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn ip_only_rule_matches_regardless_of_names() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init::init_schema(&pool).await.unwrap();
        let project_id = projects::create_project(&pool, "ITK").await.unwrap();

        add_rule(&pool, project_id, "", "", "192.0.2.7").await.unwrap();

        assert!(is_banned(&pool, project_id, "", "", "192.0.2.7").await.unwrap());
        assert!(is_banned(&pool, project_id, "b", "s", "192.0.2.7").await.unwrap());
        assert!(!is_banned(&pool, project_id, "b", "s", "192.0.2.8").await.unwrap());
    }
}
