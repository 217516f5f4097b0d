//! Project lookups

use super::models::Project;
use anyhow::Result;
use sqlx::SqlitePool;

/// Create a project (administrative/bootstrap helper)
pub async fn create_project(pool: &SqlitePool, name: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>("INSERT INTO projects (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Look up a project by display name
pub async fn find_project_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT id, name FROM projects WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(project)
}

/// Look up a project by id
pub async fn find_project_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>("SELECT id, name FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(project)
}

/// Resolve a project id to its display name
pub async fn project_name(pool: &SqlitePool, id: i64) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(name)
}
