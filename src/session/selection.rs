use anyhow::Result;
use std::collections::{BTreeSet, HashSet};

use crate::git::Repository;

/// What one reconciliation pass changed in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub staged: BTreeSet<String>,
    pub unstaged: Vec<String>,
}

/// Make the index match the user's checked files.
///
/// Every selected path is staged. A previously staged path is unstaged only when the
/// user deselected it and it carries no further working-tree edits; files that picked
/// up unstaged changes behind our back are left alone. The first backend error aborts
/// the pass; paths handled before it stay handled.
pub fn reconcile(repo: &dyn Repository, selected: &BTreeSet<String>) -> Result<ReconcileReport> {
    let unstaged: HashSet<String> = repo.unstaged_paths()?.into_iter().collect();
    let staged = repo.staged_paths()?;

    repo.stage(selected)?;

    let mut report = ReconcileReport {
        staged: selected.clone(),
        unstaged: Vec::new(),
    };
    for path in staged {
        if selected.contains(&path) || unstaged.contains(&path) {
            continue;
        }
        repo.unstage(&path)?;
        report.unstaged.push(path);
    }

    tracing::debug!(
        staged = report.staged.len(),
        unstaged = report.unstaged.len(),
        "reconciled selection"
    );
    Ok(report)
}
