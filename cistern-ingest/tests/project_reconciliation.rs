//! Project-structure reconciliation scenarios
//!
//! Drives the project handler through the real dispatcher against an
//! in-memory database and checks the stored graph afterwards.

use cistern_common::db::{init, projects, subprojects, subscriptions};
use cistern_ingest::handlers::project::ProjectHandler;
use cistern_ingest::ingest::parse_buffer;
use sqlx::SqlitePool;
use std::collections::HashSet;

async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    init::init_schema(&pool).await.unwrap();
    pool
}

async fn run_structure_submission(
    pool: &SqlitePool,
    project_id: i64,
    xml: &str,
    delete_old: bool,
) -> ProjectHandler {
    let mut handler = ProjectHandler::new(pool.clone(), project_id, delete_old);
    parse_buffer(xml.as_bytes(), &mut handler).await.unwrap();
    handler
}

/// Dependency edges of a project as (source name, target name) pairs.
async fn edge_set(pool: &SqlitePool, project_id: i64) -> HashSet<(String, String)> {
    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT src.name, dst.name
        FROM subproject_dependencies d
        JOIN subprojects src ON src.id = d.subproject_id
        JOIN subprojects dst ON dst.id = d.depends_on_id
        WHERE src.project_id = ?
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
    .unwrap();
    rows.into_iter().collect()
}

async fn subproject_names(pool: &SqlitePool, project_id: i64) -> HashSet<String> {
    sqlx::query_scalar::<_, String>("SELECT name FROM subprojects WHERE project_id = ?")
        .bind(project_id)
        .fetch_all(pool)
        .await
        .unwrap()
        .into_iter()
        .collect()
}

const TWO_SUBPROJECTS: &str = r#"<?xml version="1.0"?>
<Project name="Trilinos">
  <SubProject name="A">
    <Path>packages/a</Path>
  </SubProject>
  <SubProject name="B">
    <Dependency name="A"/>
  </SubProject>
</Project>"#;

#[tokio::test]
async fn declares_two_subprojects_and_one_edge_without_deleting() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    // A previously stored sub-project absent from the document.
    subprojects::save_subproject(&pool, project_id, "C", None, "", 1)
        .await
        .unwrap();

    let handler = run_structure_submission(&pool, project_id, TWO_SUBPROJECTS, false).await;

    assert_eq!(
        subproject_names(&pool, project_id).await,
        HashSet::from(["A".to_string(), "B".to_string(), "C".to_string()])
    );
    assert_eq!(
        edge_set(&pool, project_id).await,
        HashSet::from([("B".to_string(), "A".to_string())])
    );
    assert_eq!(handler.facts().subprojects, vec!["A", "B"]);
    assert_eq!(handler.facts().dependencies_added, 1);
    assert_eq!(handler.facts().subprojects_deleted, 0);
}

#[tokio::test]
async fn deletion_policy_removes_unmentioned_subprojects() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    let c = subprojects::save_subproject(&pool, project_id, "C", None, "", 1)
        .await
        .unwrap();
    let d = subprojects::save_subproject(&pool, project_id, "D", None, "", 2)
        .await
        .unwrap();
    subprojects::add_dependency(&pool, d, c).await.unwrap();

    let handler = run_structure_submission(&pool, project_id, TWO_SUBPROJECTS, true).await;

    assert_eq!(
        subproject_names(&pool, project_id).await,
        HashSet::from(["A".to_string(), "B".to_string()])
    );
    // C and D are gone, and their edge went with them.
    assert_eq!(
        edge_set(&pool, project_id).await,
        HashSet::from([("B".to_string(), "A".to_string())])
    );
    assert_eq!(handler.facts().subprojects_deleted, 2);
}

#[tokio::test]
async fn resubmitting_the_same_document_is_idempotent() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    run_structure_submission(&pool, project_id, TWO_SUBPROJECTS, true).await;
    let after_first = edge_set(&pool, project_id).await;
    let names_first = subproject_names(&pool, project_id).await;

    let handler = run_structure_submission(&pool, project_id, TWO_SUBPROJECTS, true).await;

    assert_eq!(edge_set(&pool, project_id).await, after_first);
    assert_eq!(subproject_names(&pool, project_id).await, names_first);
    assert_eq!(handler.facts().subprojects_deleted, 0);
    assert_eq!(handler.facts().dependencies_removed, 0);
    assert_eq!(handler.facts().dependencies_added, 0);
}

#[tokio::test]
async fn edge_to_undeclared_target_is_neither_added_nor_removed() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    // Z exists from an earlier submission, and B already depends on it.
    let z = subprojects::save_subproject(&pool, project_id, "Z", None, "", 1)
        .await
        .unwrap();
    let b = subprojects::save_subproject(&pool, project_id, "B", None, "", 2)
        .await
        .unwrap();
    subprojects::add_dependency(&pool, b, z).await.unwrap();

    // The document mentions B and re-declares the dependency on Z, but
    // never declares Z itself: the edge may be neither created anew nor
    // guessed away.
    let xml = r#"<Project name="Trilinos">
      <SubProject name="B">
        <Dependency name="Z"/>
      </SubProject>
    </Project>"#;
    run_structure_submission(&pool, project_id, xml, false).await;

    assert_eq!(
        edge_set(&pool, project_id).await,
        HashSet::from([("B".to_string(), "Z".to_string())])
    );
    assert!(subproject_names(&pool, project_id).await.contains("Z"));
}

#[tokio::test]
async fn stale_edge_between_declared_siblings_is_removed_under_policy() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    let a = subprojects::save_subproject(&pool, project_id, "A", None, "", 1)
        .await
        .unwrap();
    let b = subprojects::save_subproject(&pool, project_id, "B", None, "", 2)
        .await
        .unwrap();
    subprojects::add_dependency(&pool, b, a).await.unwrap();

    // Both sides are declared, but the edge no longer is.
    let xml = r#"<Project name="Trilinos">
      <SubProject name="A"/>
      <SubProject name="B"/>
    </Project>"#;
    let handler = run_structure_submission(&pool, project_id, xml, true).await;

    assert!(edge_set(&pool, project_id).await.is_empty());
    assert_eq!(handler.facts().dependencies_removed, 1);
}

#[tokio::test]
async fn forward_dependency_is_dropped() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    // B pre-exists, so the DEPENDENCY name resolves - but B has not
    // been declared yet at the point A closes, so the edge is dropped.
    subprojects::save_subproject(&pool, project_id, "B", None, "", 1)
        .await
        .unwrap();

    let xml = r#"<Project name="Trilinos">
      <SubProject name="A">
        <Dependency name="B"/>
      </SubProject>
      <SubProject name="B"/>
    </Project>"#;
    run_structure_submission(&pool, project_id, xml, false).await;

    assert!(edge_set(&pool, project_id).await.is_empty());
}

#[tokio::test]
async fn name_mismatch_suppresses_every_write() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();
    projects::create_project(&pool, "SomethingElse").await.unwrap();

    let xml = r#"<Project name="SomethingElse">
      <SubProject name="A">
        <Email address="dev@example.com"/>
      </SubProject>
    </Project>"#;
    let handler = run_structure_submission(&pool, project_id, xml, true).await;

    assert!(handler.facts().name_mismatch);
    assert!(subproject_names(&pool, project_id).await.is_empty());

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
    let labels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM labels")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(labels, 0);
}

#[tokio::test]
async fn emails_create_users_subscriptions_and_label_filters() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    let xml = r#"<Project name="Trilinos">
      <SubProject name="Teuchos" group="Core">
        <Email address="maintainer@example.com"/>
        <Path>packages/teuchos</Path>
      </SubProject>
    </Project>"#;
    run_structure_submission(&pool, project_id, xml, false).await;

    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind("maintainer@example.com")
        .fetch_one(&pool)
        .await
        .unwrap();

    let settings = subscriptions::subscription_settings(&pool, user_id, project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        settings,
        (
            subscriptions::EMAIL_TYPE_ALL_BUILDS,
            subscriptions::EMAIL_CATEGORY_DEFAULT
        )
    );

    let label_links: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM label_subscriptions ls
        JOIN labels l ON l.id = ls.label_id
        WHERE ls.user_id = ? AND l.text = 'Teuchos'
        "#,
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(label_links, 1);

    let row = subprojects::find_by_name(&pool, project_id, "Teuchos")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.group_name.as_deref(), Some("Core"));
    assert_eq!(row.path, "packages/teuchos");
    assert_eq!(row.position, 1);
}

#[tokio::test]
async fn positions_are_sequential_in_document_order() {
    let pool = test_pool().await;
    let project_id = projects::create_project(&pool, "Trilinos").await.unwrap();

    let xml = r#"<Project name="Trilinos">
      <SubProject name="First"/>
      <SubProject name="Second"/>
      <SubProject name="Third"/>
    </Project>"#;
    run_structure_submission(&pool, project_id, xml, false).await;

    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT name, position FROM subprojects WHERE project_id = ? ORDER BY position",
    )
    .bind(project_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(
        rows,
        vec![
            ("First".to_string(), 1),
            ("Second".to_string(), 2),
            ("Third".to_string(), 3),
        ]
    );
}
