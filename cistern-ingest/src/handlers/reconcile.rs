//! Dependency set reconciliation
//!
//! Pure three-way diff between the dependency edges a document declares
//! for a sub-project and the edges already stored, scoped by the set of
//! sub-projects the document actually mentions. Independent of the
//! parser and the database so the merge rules are testable in
//! isolation.

use std::collections::HashSet;

/// Outcome of diffing one sub-project's dependency edges.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DependencyDiff {
    /// Declared edges not yet stored.
    pub to_add: Vec<i64>,
    /// Stored edges to delete: absent from the declaration, and the
    /// target is itself part of the current document.
    pub to_remove: Vec<i64>,
    /// Stored edges left untouched: absent from the declaration, but
    /// the target is not mentioned in the document, so nothing may be
    /// inferred about it.
    pub retained: Vec<i64>,
}

/// Compute the edge changes for one sub-project.
///
/// `declared` holds the dependency ids the current document declares
/// for the sub-project (already limited to ids declared in-document);
/// `stored` holds what the database currently has; `in_document` is the
/// set of every sub-project id the document declared. When
/// `delete_stale` is off no edge is ever removed.
pub fn diff_dependencies(
    declared: &[i64],
    stored: &[i64],
    in_document: &HashSet<i64>,
    delete_stale: bool,
) -> DependencyDiff {
    let declared_set: HashSet<i64> = declared.iter().copied().collect();
    let stored_set: HashSet<i64> = stored.iter().copied().collect();

    let mut diff = DependencyDiff::default();

    for &id in declared {
        if !stored_set.contains(&id) && !diff.to_add.contains(&id) {
            diff.to_add.push(id);
        }
    }

    for &id in stored {
        if declared_set.contains(&id) {
            continue;
        }
        if delete_stale && in_document.contains(&id) {
            diff.to_remove.push(id);
        } else {
            diff.retained.push(id);
        }
    }

    diff
}
