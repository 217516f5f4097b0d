//! Project-structure reconciliation handler
//!
//! Consumes `PROJECT > SUBPROJECT > (DEPENDENCY | EMAIL | PATH)`
//! documents and merges the declared sub-project/dependency graph into
//! persisted state. A dependency may only point at a sibling declared
//! in the same document; stored relationships between sub-projects the
//! document never mentions are left untouched.

use crate::handlers::reconcile::diff_dependencies;
use crate::handlers::{AttrMap, HandlerCore, XmlHandler};
use crate::ingest::IngestError;
use cistern_common::db::{labels, projects, subprojects, subscriptions, users};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::{error, warn};

/// Summary of what a structure submission changed.
#[derive(Debug, Default)]
pub struct ProjectFacts {
    /// Names of the sub-projects declared by the document, in order.
    pub subprojects: Vec<String>,
    pub dependencies_added: usize,
    pub dependencies_removed: usize,
    pub subprojects_deleted: usize,
    /// True when the document named a different project and every
    /// write was suppressed.
    pub name_mismatch: bool,
}

/// A sub-project being accumulated between its start and end elements.
#[derive(Debug)]
struct PendingSubProject {
    name: String,
    group: Option<String>,
    path: Option<String>,
    /// Declared dependencies: name plus the id it resolved to in
    /// persisted state (None when no such sub-project exists).
    dependencies: Vec<(String, Option<i64>)>,
    emails: Vec<String>,
}

#[derive(Debug)]
pub struct ProjectHandler {
    db: SqlitePool,
    core: HandlerCore,
    project_id: i64,
    delete_old_subprojects: bool,
    /// Once false, every subsequent event is a no-op.
    name_matches: bool,
    /// The name check runs once, on the first PROJECT element.
    name_checked: bool,
    next_position: i64,
    current: Option<PendingSubProject>,
    /// Sub-projects persisted from this document, id -> name.
    doc_subprojects: HashMap<i64, String>,
    /// Persisted order, for deterministic reconciliation.
    doc_order: Vec<i64>,
    /// Per sub-project id, the declared dependency ids that survived
    /// the declared-earlier-in-document filter.
    declared: HashMap<i64, Vec<i64>>,
    facts: ProjectFacts,
}

impl ProjectHandler {
    pub fn new(db: SqlitePool, project_id: i64, delete_old_subprojects: bool) -> Self {
        Self {
            db,
            core: HandlerCore::default(),
            project_id,
            delete_old_subprojects,
            name_matches: true,
            name_checked: false,
            next_position: 1,
            current: None,
            doc_subprojects: HashMap::new(),
            doc_order: Vec::new(),
            declared: HashMap::new(),
            facts: ProjectFacts::default(),
        }
    }

    pub fn facts(&self) -> &ProjectFacts {
        &self.facts
    }

    pub(crate) fn into_parts(self) -> (HandlerCore, ProjectFacts) {
        (self.core, self.facts)
    }

    /// Persist the accumulated sub-project and its side effects as one
    /// transaction: the row itself, its label, and the subscriptions
    /// for its declared email addresses.
    async fn finish_subproject(&mut self) -> Result<(), IngestError> {
        let Some(pending) = self.current.take() else {
            return Ok(());
        };

        let mut tx = self.db.begin().await?;

        let id = subprojects::save_subproject(
            &mut *tx,
            self.project_id,
            &pending.name,
            pending.group.as_deref(),
            pending.path.as_deref().unwrap_or(""),
            self.next_position,
        )
        .await?;
        self.next_position += 1;

        labels::insert_label(&mut *tx, &pending.name).await?;

        self.doc_subprojects.insert(id, pending.name.clone());
        self.doc_order.push(id);

        // An edge may only reference a sibling declared in this same
        // document. Anything else is logged and dropped; persisted
        // state is never used to invent cross-document edges.
        let mut declared_ids = Vec::new();
        for (dep_name, dep_id) in &pending.dependencies {
            match dep_id {
                Some(dep) if self.doc_subprojects.contains_key(dep) => declared_ids.push(*dep),
                _ => warn!(
                    project_id = self.project_id,
                    subproject = %pending.name,
                    dependency = %dep_name,
                    "dependency not declared earlier in this structure submission, dropping edge"
                ),
            }
        }

        for email in &pending.emails {
            let user_id = users::find_or_create_user(&mut *tx, email).await?;
            subscriptions::ensure_project_subscription(&mut *tx, user_id, self.project_id).await?;
            if let Some(label_id) = labels::find_label_id(&mut *tx, &pending.name).await? {
                subscriptions::ensure_label_subscription(&mut *tx, label_id, user_id, self.project_id)
                    .await?;
            }
        }

        tx.commit().await?;

        self.declared.insert(id, declared_ids);
        self.facts.subprojects.push(pending.name);
        Ok(())
    }

    /// Reconcile every sub-project this document touched against its
    /// stored dependency edges, then apply the deletion policy to
    /// sub-projects the document never mentioned.
    async fn finish_project(&mut self) -> Result<(), IngestError> {
        let doc_ids: HashSet<i64> = self.doc_subprojects.keys().copied().collect();

        for id in self.doc_order.clone() {
            let declared = self.declared.get(&id).cloned().unwrap_or_default();

            let mut tx = self.db.begin().await?;
            let stored = subprojects::dependencies_of(&mut *tx, id).await?;
            let diff =
                diff_dependencies(&declared, &stored, &doc_ids, self.delete_old_subprojects);

            for &target in &diff.to_remove {
                subprojects::remove_dependency(&mut *tx, id, target).await?;
            }
            if self.delete_old_subprojects {
                for &target in &diff.retained {
                    let target_name = subprojects::subproject_name(&mut *tx, target)
                        .await?
                        .unwrap_or_else(|| target.to_string());
                    warn!(
                        project_id = self.project_id,
                        subproject = %self.doc_subprojects[&id],
                        dependency = %target_name,
                        "not removing dependency because it is not a SUBPROJECT element in this document"
                    );
                }
            }
            for &target in &diff.to_add {
                subprojects::add_dependency(&mut *tx, id, target).await?;
            }
            tx.commit().await?;

            self.facts.dependencies_added += diff.to_add.len();
            self.facts.dependencies_removed += diff.to_remove.len();
        }

        if self.delete_old_subprojects {
            let previous = subprojects::subproject_ids(&self.db, self.project_id).await?;
            for prev in previous {
                if doc_ids.contains(&prev) {
                    continue;
                }
                let name = subprojects::subproject_name(&self.db, prev)
                    .await?
                    .unwrap_or_else(|| prev.to_string());
                subprojects::delete_subproject(&self.db, prev).await?;
                warn!(
                    project_id = self.project_id,
                    subproject = %name,
                    "deleted sub-project because it was not mentioned in the structure submission"
                );
                self.facts.subprojects_deleted += 1;
            }
        }
        Ok(())
    }
}

impl XmlHandler for ProjectHandler {
    async fn start_element(&mut self, name: &str, attributes: &AttrMap) -> Result<(), IngestError> {
        self.core.open(name, attributes);

        if name == "PROJECT" && !self.name_checked {
            self.name_checked = true;
            let declared_name = attributes.get("NAME").map(String::as_str).unwrap_or("");
            let resolved = projects::find_project_by_name(&self.db, declared_name).await?;
            if resolved.map(|p| p.id) != Some(self.project_id) {
                error!(
                    project_id = self.project_id,
                    declared = declared_name,
                    "wrong project name in structure submission, suppressing all writes"
                );
                self.name_matches = false;
                self.facts.name_mismatch = true;
            }
        }

        if !self.name_matches {
            return Ok(());
        }

        match name {
            "SUBPROJECT" => {
                self.current = Some(PendingSubProject {
                    name: attributes.get("NAME").cloned().unwrap_or_default(),
                    group: attributes.get("GROUP").cloned(),
                    path: None,
                    dependencies: Vec::new(),
                    emails: Vec::new(),
                });
            }
            "DEPENDENCY" => {
                if let Some(dep_name) = attributes.get("NAME") {
                    // Resolution goes through persisted state: a sibling
                    // declared earlier in this document is already saved
                    // and resolves here.
                    let resolved = subprojects::find_by_name(&self.db, self.project_id, dep_name)
                        .await?
                        .map(|s| s.id);
                    if let Some(current) = &mut self.current {
                        current.dependencies.push((dep_name.clone(), resolved));
                    }
                }
            }
            "EMAIL" => {
                if let Some(address) = attributes.get("ADDRESS") {
                    if let Some(current) = &mut self.current {
                        current.emails.push(address.clone());
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn end_element(&mut self, name: &str) -> Result<(), IngestError> {
        if self.name_matches {
            match name {
                "SUBPROJECT" => self.finish_subproject().await?,
                "PROJECT" => self.finish_project().await?,
                _ => {}
            }
        }
        self.core.close(name);
        Ok(())
    }

    fn text(&mut self, data: &str) {
        if self.core.current() == Some("PATH") {
            if let Some(current) = &mut self.current {
                current.path.get_or_insert_with(String::new).push_str(data);
            }
        }
    }
}
