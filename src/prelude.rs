//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use fs_sentinel::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{FsnError, Result};

// Scanner
pub use crate::scanner::collector::{Collection, FileRecord, MetadataCollector};
pub use crate::scanner::diff::{
    ChangeKind, ChangeReport, IncrementalReport, compare_full, compare_incremental,
};
pub use crate::scanner::grouping::{format_grouped_changes, group_by_directory};
pub use crate::scanner::security::{SecurityAssessment, SeverityLevel, classify};
pub use crate::scanner::tree::{MerkleNode, MerkleTree};

// State
pub use crate::state::{PersistedState, StateStore};

// Logging
pub use crate::logger::jsonl::{EventType, JsonlLogger, LogEntry, Severity};
