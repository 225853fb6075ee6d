//! Durable scan state: the persisted tree record and its on-disk store.
//!
//! One JSON state file exists per `(root_path, exclude_patterns)`
//! combination, named from a hash of that pair plus a readable sanitized
//! root path. A run either fully replaces the file (write-to-temp, then
//! rename) or leaves the prior one untouched; there is no in-place
//! patching, so a crash mid-write can never produce a file that parses as
//! valid state.
//!
//! Loading distinguishes three degradation paths the caller collapses to
//! "no previous state": the file is missing, it fails to parse
//! (`StateCorrupt`), or it records a different scan root (`StateStale`).

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write as IoWrite};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::errors::{FsnError, Result};
use crate::core::paths::sanitize_root_for_state_file;
use crate::scanner::hasher::sha256_hex;
use crate::scanner::tree::{MerkleNode, MerkleTree};

/// Persisted node shape.
///
/// The in-memory tree encodes leaf-vs-internal in its variant; the storage
/// format cannot, so every record carries an explicit `is_leaf`
/// discriminator. Decoding validates the shape: a leaf must carry
/// `file_path`, an internal record must carry both children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Lowercase-hex SHA-256 digest.
    pub hash: String,
    /// Shape discriminator.
    pub is_leaf: bool,
    /// Leaf payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Internal payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<NodeRecord>>,
    /// Internal payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<NodeRecord>>,
}

/// Recursively encode a tree node into its persisted record.
#[must_use]
pub fn encode_node(node: &MerkleNode) -> NodeRecord {
    match node {
        MerkleNode::Leaf { hash, file_path } => NodeRecord {
            hash: hash.clone(),
            is_leaf: true,
            file_path: Some(file_path.clone()),
            left: None,
            right: None,
        },
        MerkleNode::Internal { hash, left, right } => NodeRecord {
            hash: hash.clone(),
            is_leaf: false,
            file_path: None,
            left: Some(Box::new(encode_node(left))),
            right: Some(Box::new(encode_node(right))),
        },
    }
}

/// Recursively decode a persisted record into a tree node.
///
/// The exact tree shape is reconstructed, not just the leaf set — the
/// incremental diff depends on structural congruence between runs.
pub fn decode_node(record: &NodeRecord) -> Result<MerkleNode> {
    if record.is_leaf {
        let file_path = record
            .file_path
            .clone()
            .ok_or_else(|| FsnError::StateCorrupt {
                context: "decode_node",
                details: "leaf record missing file_path".to_string(),
            })?;
        Ok(MerkleNode::Leaf {
            hash: record.hash.clone(),
            file_path,
        })
    } else {
        let (Some(left), Some(right)) = (record.left.as_deref(), record.right.as_deref()) else {
            return Err(FsnError::StateCorrupt {
                context: "decode_node",
                details: "internal record missing a child".to_string(),
            });
        };
        Ok(MerkleNode::Internal {
            hash: record.hash.clone(),
            left: Box::new(decode_node(left)?),
            right: Box::new(decode_node(right)?),
        })
    }
}

/// The durable, versionless on-disk record of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Absolute path of the scanned root.
    pub root_path: String,
    /// RFC 3339 UTC timestamp of the scan that wrote this state.
    pub timestamp: String,
    /// Root digest of the scanned file set.
    pub root_hash: String,
    /// Number of files in the set.
    pub file_count: usize,
    /// Relative path → leaf digest.
    pub file_hashes: HashMap<String, String>,
    /// Recursive tree structure; `null` for an empty file set.
    pub tree_structure: Option<NodeRecord>,
}

impl PersistedState {
    /// Capture a built tree as persistable state, stamped with the current
    /// UTC time.
    #[must_use]
    pub fn snapshot(tree: &MerkleTree) -> Self {
        Self {
            root_path: tree.root_path.to_string_lossy().into_owned(),
            timestamp: Utc::now().to_rfc3339(),
            root_hash: tree.root_hash.clone(),
            file_count: tree.file_count(),
            file_hashes: tree.leaf_hashes.clone(),
            tree_structure: tree.root.as_ref().map(encode_node),
        }
    }

    /// Decode the stored tree structure, if any.
    pub fn decode_tree(&self) -> Result<Option<MerkleNode>> {
        self.tree_structure.as_ref().map(decode_node).transpose()
    }
}

/// On-disk store keyed by `(root_path, exclude_patterns)`.
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `state_dir` (created lazily on save).
    #[must_use]
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Deterministic state file path for one scan target.
    ///
    /// `<state-dir>/<first-16-hex-of-SHA256(root ++ excludes)>_<sanitized
    /// root, max 50 chars>.json` — the hash prefix keys the exact
    /// combination, the sanitized path keeps the file recognizable.
    #[must_use]
    pub fn state_file_path(&self, root_path: &Path, exclude_patterns: &[String]) -> PathBuf {
        let root_str = root_path.to_string_lossy();
        let mut key_input = root_str.to_string();
        for pattern in exclude_patterns {
            key_input.push_str(pattern);
        }
        let digest = sha256_hex(&key_input);
        let key = &digest[..16];
        let readable = sanitize_root_for_state_file(&root_str);
        self.state_dir.join(format!("{key}_{readable}.json"))
    }

    /// Load the previous state for a scan target.
    ///
    /// `Ok(None)` when no state file exists (first run). `StateCorrupt` and
    /// `StateStale` are recoverable: callers collapse them to first-run
    /// semantics after surfacing a notice.
    pub fn load(&self, root_path: &Path, exclude_patterns: &[String]) -> Result<Option<PersistedState>> {
        let path = self.state_file_path(root_path, exclude_patterns);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path).map_err(|source| FsnError::io(&path, source))?;
        let state: PersistedState =
            serde_json::from_str(&raw).map_err(|err| FsnError::StateCorrupt {
                context: "state_load",
                details: err.to_string(),
            })?;

        let expected = root_path.to_string_lossy();
        if state.root_path != expected {
            return Err(FsnError::StateStale {
                expected: expected.into_owned(),
                found: state.root_path,
            });
        }

        Ok(Some(state))
    }

    /// Atomically replace the state file for a scan target.
    ///
    /// Serialization problems surface as `Serialization`; anything the disk
    /// does wrong surfaces as `StateWrite`, which is fatal for the run —
    /// silently losing the new state would corrupt the next run's diff.
    pub fn save(
        &self,
        state: &PersistedState,
        root_path: &Path,
        exclude_patterns: &[String],
    ) -> Result<PathBuf> {
        let path = self.state_file_path(root_path, exclude_patterns);
        let body = serde_json::to_string_pretty(state).map_err(|err| FsnError::Serialization {
            context: "state_save",
            details: err.to_string(),
        })?;

        fs::create_dir_all(&self.state_dir)
            .map_err(|source| FsnError::state_write(&self.state_dir, source))?;

        let temp_path = path.with_extension("tmp");
        let file = {
            let mut opts = OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt as _;
                opts.mode(0o600);
            }
            opts.open(&temp_path)
                .map_err(|source| FsnError::state_write(&temp_path, source))?
        };

        let mut writer = BufWriter::new(file);
        writer
            .write_all(body.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|source| FsnError::state_write(&temp_path, source))?;

        fs::rename(&temp_path, &path).map_err(|source| FsnError::state_write(&path, source))?;

        Ok(path)
    }
}
