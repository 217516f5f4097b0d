//! Row types for the Cistern schema

use sqlx::FromRow;

/// A project registered on this server.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
}

/// A build submitted for a project from a site.
#[derive(Debug, Clone, FromRow)]
pub struct Build {
    pub id: i64,
    pub project_id: i64,
    pub site_id: Option<i64>,
    pub name: String,
    pub stamp: String,
}

/// A named partition of a project's build graph.
///
/// Created, updated, and deleted only by project-structure
/// reconciliation.
#[derive(Debug, Clone, FromRow)]
pub struct SubProject {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub group_name: Option<String>,
    pub path: String,
    pub position: i64,
}

/// Pre-registered descriptor for a submission whose bytes arrive
/// separately; looked up by checksum.
#[derive(Debug, Clone, FromRow)]
pub struct SubmissionRecord {
    pub checksum: String,
    pub kind: String,
    pub build_id: i64,
    pub filename: String,
}
