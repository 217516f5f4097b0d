//! Sub-project persistence and dependency edges
//!
//! Write paths take an executor so reconciliation can run them inside a
//! transaction; lookups used during parsing take the pool directly.

use super::models::SubProject;
use anyhow::Result;
use sqlx::{SqliteExecutor, SqlitePool};

/// Look up a sub-project by name within a project.
///
/// Dependency references resolve through this: persisted state, not
/// just what the current document has declared.
pub async fn find_by_name(
    pool: &SqlitePool,
    project_id: i64,
    name: &str,
) -> Result<Option<SubProject>> {
    let subproject = sqlx::query_as::<_, SubProject>(
        r#"
        SELECT id, project_id, name, group_name, path, position
        FROM subprojects
        WHERE project_id = ? AND name = ?
        "#,
    )
    .bind(project_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(subproject)
}

/// Resolve a sub-project id to its name
pub async fn subproject_name(
    executor: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM subprojects WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(name)
}

/// All sub-project ids currently stored for a project
pub async fn subproject_ids(pool: &SqlitePool, project_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM subprojects WHERE project_id = ?")
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Insert or update a sub-project, returning its id.
///
/// An existing row (same project + name) keeps its id; group, path and
/// position are refreshed from the current submission.
pub async fn save_subproject(
    executor: impl SqliteExecutor<'_>,
    project_id: i64,
    name: &str,
    group_name: Option<&str>,
    path: &str,
    position: i64,
) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO subprojects (project_id, name, group_name, path, position)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (project_id, name) DO UPDATE SET
            group_name = excluded.group_name,
            path = excluded.path,
            position = excluded.position
        RETURNING id
        "#,
    )
    .bind(project_id)
    .bind(name)
    .bind(group_name)
    .bind(path)
    .bind(position)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

/// Stored dependency ids of a sub-project
pub async fn dependencies_of(executor: impl SqliteExecutor<'_>, id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT depends_on_id FROM subproject_dependencies WHERE subproject_id = ?",
    )
    .bind(id)
    .fetch_all(executor)
    .await?;
    Ok(ids)
}

/// Add a dependency edge (idempotent)
pub async fn add_dependency(
    executor: impl SqliteExecutor<'_>,
    subproject_id: i64,
    depends_on_id: i64,
) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO subproject_dependencies (subproject_id, depends_on_id) VALUES (?, ?)",
    )
    .bind(subproject_id)
    .bind(depends_on_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Remove a dependency edge
pub async fn remove_dependency(
    executor: impl SqliteExecutor<'_>,
    subproject_id: i64,
    depends_on_id: i64,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM subproject_dependencies WHERE subproject_id = ? AND depends_on_id = ?",
    )
    .bind(subproject_id)
    .bind(depends_on_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete a sub-project. Dependency edges referencing it from either
/// side are removed by the schema's cascade rules.
pub async fn delete_subproject(executor: impl SqliteExecutor<'_>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM subprojects WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
