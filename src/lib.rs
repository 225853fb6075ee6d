#![forbid(unsafe_code)]

//! fs_sentinel (fsn) — filesystem-state change detector built on a metadata
//! Merkle tree.
//!
//! Scan pipeline:
//! 1. **Collector** — parallel `lstat` walk producing ordered per-file
//!    metadata records
//! 2. **Merkle tree** — SHA-256 hash tree over the records, with a root-hash
//!    summary of the whole file set
//! 3. **Diff engine** — full set comparison, or incremental comparison that
//!    prunes unchanged subtrees by hash
//! 4. **Security classifier** — severity scoring of each changed path
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use fs_sentinel::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use fs_sentinel::core::config::Config;
//! use fs_sentinel::scanner::collector::MetadataCollector;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod scanner;
pub mod state;
