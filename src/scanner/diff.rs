//! Change detection between the current tree and the previous run's state.
//!
//! Two strategies with identical change semantics:
//! - **full** — compare every path's leaf hash; the baseline correctness
//!   oracle, O(total files)
//! - **incremental** — compare tree structures and prune every subtree whose
//!   hash matches, O(changed leaves · tree depth) when edits are in-place
//!
//! The tree is rebuilt by sorting-then-pairing every run, so an insertion or
//! deletion can shift the pairing of every subsequent leaf and cascade hash
//! changes up their ancestors. The incremental walk then degrades toward a
//! full scan and may over-report `modified` — but `added` and `removed` come
//! from exact path-set differences, and nothing is ever under-reported.

#![allow(missing_docs)]

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::scanner::tree::{MerkleNode, MerkleTree};
use crate::state::PersistedState;

/// How a path changed between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present now, absent before.
    Added,
    /// Present in both runs with differing leaf hashes.
    Modified,
    /// Absent now, present before.
    Removed,
}

impl ChangeKind {
    /// Lowercase label used in reports and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }

    /// One-character symbol used by the grouped change renderer.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Added => '+',
            Self::Modified => '*',
            Self::Removed => '-',
        }
    }
}

/// Changed paths between two runs, each list sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl ChangeReport {
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }
}

/// [`ChangeReport`] plus the incremental walk's work accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncrementalReport {
    /// The detected changes.
    #[serde(flatten)]
    pub changes: ChangeReport,
    /// Paths the walk had to examine.
    pub files_checked: usize,
    /// Paths proven unchanged by subtree-hash pruning.
    pub files_skipped: usize,
}

/// Full comparison: leaf-hash set comparison over every path.
#[must_use]
pub fn compare_full(current: &MerkleTree, previous: &PersistedState) -> ChangeReport {
    compare_hash_maps(&current.leaf_hashes, &previous.file_hashes)
}

fn compare_hash_maps(
    current: &HashMap<String, String>,
    previous: &HashMap<String, String>,
) -> ChangeReport {
    let mut added: Vec<String> = current
        .keys()
        .filter(|path| !previous.contains_key(*path))
        .cloned()
        .collect();
    let mut removed: Vec<String> = previous
        .keys()
        .filter(|path| !current.contains_key(*path))
        .cloned()
        .collect();
    let mut modified: Vec<String> = current
        .iter()
        .filter(|(path, hash)| previous.get(*path).is_some_and(|prev| prev != *hash))
        .map(|(path, _)| path.clone())
        .collect();

    added.sort_unstable();
    removed.sort_unstable();
    modified.sort_unstable();

    ChangeReport {
        added,
        removed,
        modified,
    }
}

/// Incremental comparison: root-hash fast path, then a structural walk that
/// prunes unchanged subtrees.
///
/// Falls back to the full comparison when the previous state carries no
/// usable tree structure (first runs persisted by other means, or an empty
/// previous tree).
#[must_use]
pub fn compare_incremental(current: &MerkleTree, previous: &PersistedState) -> IncrementalReport {
    // Whole-tree short-circuit: equal roots prove an identical file set,
    // independent of tree size.
    if current.root_hash == previous.root_hash {
        return IncrementalReport {
            changes: ChangeReport::default(),
            files_checked: 0,
            files_skipped: current.file_count(),
        };
    }

    let previous_tree = previous.decode_tree().ok().flatten();
    let (Some(current_root), Some(previous_root)) = (current.root.as_ref(), previous_tree.as_ref())
    else {
        // No structure to walk on one side; the full comparison examines
        // every path.
        let changes = compare_full(current, previous);
        let files_checked = current
            .file_count()
            .max(previous.file_hashes.len());
        return IncrementalReport {
            changes,
            files_checked,
            files_skipped: 0,
        };
    };

    let mut changed = Vec::new();
    find_changed_subtrees(current_root, previous_root, &mut changed);
    let changed: BTreeSet<String> = changed.into_iter().collect();

    let current_paths: BTreeSet<&String> = current.leaf_hashes.keys().collect();
    let previous_paths: BTreeSet<&String> = previous.file_hashes.keys().collect();

    let added: Vec<String> = current_paths
        .difference(&previous_paths)
        .map(|p| (*p).clone())
        .collect();
    let removed: Vec<String> = previous_paths
        .difference(&current_paths)
        .map(|p| (*p).clone())
        .collect();
    // A changed path present in both runs is a modification; paths only on
    // one side were already captured by the exact set differences.
    let modified: Vec<String> = changed
        .iter()
        .filter(|path| {
            current.leaf_hashes.contains_key(*path) && previous.file_hashes.contains_key(*path)
        })
        .cloned()
        .collect();

    let files_checked = changed.len() + added.len() + removed.len();
    let files_skipped = current.file_count().saturating_sub(changed.len());

    IncrementalReport {
        changes: ChangeReport {
            added,
            removed,
            modified,
        },
        files_checked,
        files_skipped,
    }
}

/// Recursive positional walk over `(current, previous)` node pairs.
///
/// Equal hashes prove the whole subtree unchanged — prune. On shape
/// divergence (leaf vs internal) positional correspondence is lost, so
/// every leaf under the current side is conservatively treated as changed.
fn find_changed_subtrees(current: &MerkleNode, previous: &MerkleNode, changed: &mut Vec<String>) {
    if current.hash() == previous.hash() {
        return;
    }

    match (current, previous) {
        (MerkleNode::Leaf { file_path, .. }, MerkleNode::Leaf { .. })
        | (MerkleNode::Leaf { file_path, .. }, MerkleNode::Internal { .. }) => {
            changed.push(file_path.clone());
        }
        (MerkleNode::Internal { .. }, MerkleNode::Leaf { .. }) => {
            current.collect_leaf_paths(changed);
        }
        (
            MerkleNode::Internal { left, right, .. },
            MerkleNode::Internal {
                left: prev_left,
                right: prev_right,
                ..
            },
        ) => {
            find_changed_subtrees(left, prev_left, changed);
            find_changed_subtrees(right, prev_right, changed);
        }
    }
}
