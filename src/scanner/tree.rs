//! Metadata Merkle tree: sum-type nodes and the sort-then-pair builder.
//!
//! The tree is rebuilt from scratch on every scan. Records are sorted by
//! relative path before pairing, which makes the root hash a pure function
//! of the file set — the same files produce the same root regardless of the
//! order the collector discovered them in. A level with an odd node count
//! pairs its trailing node with itself (`hash(h, h)`); this rule must be
//! preserved exactly for root-hash compatibility across implementations.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::scanner::collector::FileRecord;
use crate::scanner::hasher;

/// One node of the tree. The variant *is* the leaf/internal distinction;
/// there is no flag to keep in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleNode {
    /// Terminal node: one file's digest.
    Leaf {
        /// Lowercase-hex SHA-256 digest of the file's identity metadata.
        hash: String,
        /// Path relative to the scan root.
        file_path: String,
    },
    /// Interior node over two children (which may be clones of the same
    /// subtree, from odd-level self-pairing).
    Internal {
        /// `SHA-256(left.hash ++ right.hash)` over the hex strings.
        hash: String,
        /// Left child, owned outright.
        left: Box<MerkleNode>,
        /// Right child, owned outright.
        right: Box<MerkleNode>,
    },
}

impl MerkleNode {
    /// The node's digest, computed once at construction.
    #[must_use]
    pub fn hash(&self) -> &str {
        match self {
            Self::Leaf { hash, .. } | Self::Internal { hash, .. } => hash,
        }
    }

    /// Number of leaves reachable from this node. Self-paired subtrees are
    /// counted once per occurrence, mirroring the duplicated structure.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Append every leaf path under this node to `out`.
    pub fn collect_leaf_paths(&self, out: &mut Vec<String>) {
        match self {
            Self::Leaf { file_path, .. } => out.push(file_path.clone()),
            Self::Internal { left, right, .. } => {
                left.collect_leaf_paths(out);
                right.collect_leaf_paths(out);
            }
        }
    }
}

/// A built tree plus its flat leaf index.
///
/// `leaf_hashes` always describes exactly the leaves reachable from `root`;
/// both are produced by the same [`MerkleTree::build`] pass and never
/// mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleTree {
    /// Absolute path of the scanned root.
    pub root_path: PathBuf,
    /// Exclusion patterns the scan ran with (part of the state identity).
    pub exclude_patterns: Vec<String>,
    /// Root node; `None` exactly when the scanned file set was empty.
    pub root: Option<MerkleNode>,
    /// Root digest. For the empty set this is `SHA-256("empty")`.
    pub root_hash: String,
    /// Relative path → leaf digest, for O(1) full-comparison lookups.
    pub leaf_hashes: HashMap<String, String>,
}

impl MerkleTree {
    /// Build the tree bottom-up from collected records.
    ///
    /// Pure structural transform: sorting happens here, so callers may pass
    /// records in any order.
    #[must_use]
    pub fn build(
        root_path: PathBuf,
        exclude_patterns: Vec<String>,
        mut records: Vec<FileRecord>,
    ) -> Self {
        // Load-bearing sort: byte-wise ascending path order is what makes
        // the root hash reproducible.
        records.sort_unstable_by(|a, b| a.relative_path.cmp(&b.relative_path));

        let mut leaf_hashes = HashMap::with_capacity(records.len());
        let mut nodes: Vec<MerkleNode> = Vec::with_capacity(records.len());
        for record in &records {
            let hash = hasher::leaf_hash(record);
            leaf_hashes.insert(record.relative_path.clone(), hash.clone());
            nodes.push(MerkleNode::Leaf {
                hash,
                file_path: record.relative_path.clone(),
            });
        }

        if nodes.is_empty() {
            return Self {
                root_path,
                exclude_patterns,
                root: None,
                root_hash: hasher::empty_root_hash(),
                leaf_hashes,
            };
        }

        let root = loop {
            if nodes.len() == 1 {
                break nodes.remove(0);
            }
            let mut next_level = Vec::with_capacity(nodes.len().div_ceil(2));
            let mut iter = nodes.into_iter();
            while let Some(left) = iter.next() {
                let parent = match iter.next() {
                    Some(right) => {
                        let hash = hasher::internal_hash(left.hash(), right.hash());
                        MerkleNode::Internal {
                            hash,
                            left: Box::new(left),
                            right: Box::new(right),
                        }
                    }
                    // Odd node count: the trailing node pairs with itself.
                    None => {
                        let hash = hasher::internal_hash(left.hash(), left.hash());
                        let right = left.clone();
                        MerkleNode::Internal {
                            hash,
                            left: Box::new(left),
                            right: Box::new(right),
                        }
                    }
                };
                next_level.push(parent);
            }
            nodes = next_level;
        };

        Self {
            root_path,
            exclude_patterns,
            root_hash: root.hash().to_string(),
            root: Some(root),
            leaf_hashes,
        }
    }

    /// Number of distinct files in the tree.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.leaf_hashes.len()
    }
}
