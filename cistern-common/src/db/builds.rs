//! Build and site lookups
//!
//! The ingestion engine only reads these tables; builds and sites are
//! created by the result-processing pipeline (and by tests).

use super::models::Build;
use anyhow::Result;
use sqlx::SqlitePool;

/// Create a site (administrative/test helper)
pub async fn create_site(pool: &SqlitePool, name: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>("INSERT INTO sites (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Create a build (administrative/test helper)
pub async fn create_build(
    pool: &SqlitePool,
    project_id: i64,
    site_id: Option<i64>,
    name: &str,
    stamp: &str,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO builds (project_id, site_id, name, stamp) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(project_id)
    .bind(site_id)
    .bind(name)
    .bind(stamp)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Look up a build by id
pub async fn find_build(pool: &SqlitePool, id: i64) -> Result<Option<Build>> {
    let build = sqlx::query_as::<_, Build>(
        "SELECT id, project_id, site_id, name, stamp FROM builds WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(build)
}

/// Resolve the site name for a build
pub async fn site_name_for_build(pool: &SqlitePool, build_id: i64) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>(
        r#"
        SELECT sites.name FROM sites
        WHERE sites.id = (SELECT site_id FROM builds WHERE builds.id = ?)
        "#,
    )
    .bind(build_id)
    .fetch_optional(pool)
    .await?;
    Ok(name)
}
