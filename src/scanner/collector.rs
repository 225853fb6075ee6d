//! Parallel metadata collector: the `lstat` fan-out stage of a scan.
//!
//! Workers pull directories from a bounded work queue, stat their entries
//! without following symlinks, and push per-file records into a results
//! queue that a single drain turns into one ordered list. Concurrency stops
//! here: the tree build and diff stages downstream are strictly sequential
//! over the sorted record list, so no shared tree or map state is ever
//! touched from a worker.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel as channel;

use crate::core::errors::{FsnError, Result};

/// Identity-relevant metadata for one filesystem entry.
///
/// Only the fields that feed the leaf hash survive collection; everything
/// else about the file is discarded at the stat call.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    /// Modification time as seconds since the epoch.
    pub mtime: f64,
    /// POSIX mode bits including the file-type bits.
    pub mode: u32,
    /// Packed major/minor device numbers (device files only).
    pub rdev: u64,
}

/// Result of one collection pass.
#[derive(Debug)]
pub struct Collection {
    /// Records sorted by `relative_path`, ascending byte-wise.
    pub records: Vec<FileRecord>,
    /// Entries dropped for per-file reasons (vanished, unreadable,
    /// non-UTF-8 path). Never aborts the scan.
    pub files_skipped: usize,
}

/// Item in the internal work queue: a directory to read.
type WorkItem = PathBuf;

/// Parallel directory walker producing [`FileRecord`]s.
///
/// Safety invariants:
/// - `lstat` semantics throughout; symlinks are recorded, never followed
/// - Excluded paths are pruned before descending
/// - Per-entry errors are counted, not propagated
pub struct MetadataCollector {
    root_path: PathBuf,
    exclude_patterns: Vec<String>,
    parallelism: usize,
}

impl MetadataCollector {
    pub fn new(root_path: PathBuf, exclude_patterns: Vec<String>, parallelism: usize) -> Self {
        Self {
            root_path,
            exclude_patterns,
            parallelism: parallelism.max(1),
        }
    }

    /// Walk the root and collect every non-directory entry's metadata.
    ///
    /// Returns an empty collection when the root itself is missing or
    /// unreadable (first-run semantics on a vanished target); any other
    /// root-level IO failure is surfaced.
    pub fn collect(&self) -> Result<Collection> {
        let root_meta = match fs::symlink_metadata(&self.root_path) {
            Ok(meta) => meta,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::NotFound | ErrorKind::PermissionDenied
                ) =>
            {
                return Ok(Collection {
                    records: Vec::new(),
                    files_skipped: 0,
                });
            }
            Err(err) => return Err(FsnError::io(&self.root_path, err)),
        };
        if !root_meta.is_dir() {
            return Ok(Collection {
                records: Vec::new(),
                files_skipped: 0,
            });
        }

        // Channels: work items (bounded) and results (unbounded for
        // throughput), plus an in-flight counter so workers know when the
        // queue has truly drained.
        let (work_tx, work_rx) = channel::bounded::<WorkItem>(4096);
        let (result_tx, result_rx) = channel::unbounded::<FileRecord>();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let skipped = Arc::new(AtomicUsize::new(0));

        in_flight.fetch_add(1, Ordering::Release);
        work_tx
            .send(self.root_path.clone())
            .map_err(|_| FsnError::ChannelClosed {
                component: "collector_work_queue",
            })?;

        let mut handles = Vec::with_capacity(self.parallelism);
        for _ in 0..self.parallelism {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let result_tx = result_tx.clone();
            let in_flight = Arc::clone(&in_flight);
            let skipped = Arc::clone(&skipped);
            let root = self.root_path.clone();
            let patterns = self.exclude_patterns.clone();

            handles.push(thread::spawn(move || {
                collector_thread(
                    &work_rx, &work_tx, &result_tx, &in_flight, &skipped, &root, &patterns,
                );
            }));
        }
        // Drop the originals so the results channel closes once every worker
        // has exited.
        drop(work_tx);
        drop(result_tx);

        let mut records: Vec<FileRecord> = result_rx.iter().collect();
        for handle in handles {
            let _ = handle.join();
        }

        // Sort for a consistent tree structure; worker scheduling must not
        // influence the root hash.
        records.sort_unstable_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok(Collection {
            records,
            files_skipped: skipped.load(Ordering::Acquire),
        })
    }
}

/// Worker loop: pull directories, stat their entries, enqueue subdirectories.
#[allow(clippy::too_many_arguments)]
fn collector_thread(
    work_rx: &channel::Receiver<WorkItem>,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<FileRecord>,
    in_flight: &AtomicUsize,
    skipped: &AtomicUsize,
    root: &Path,
    patterns: &[String],
) {
    loop {
        match work_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(dir_path) => {
                process_directory(
                    &dir_path, work_tx, result_tx, in_flight, skipped, root, patterns,
                );
                in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Read one directory: emit records for non-directory entries, enqueue real
/// subdirectories. Vanished and unreadable entries bump the skip counter.
#[allow(clippy::too_many_arguments)]
fn process_directory(
    dir_path: &Path,
    work_tx: &channel::Sender<WorkItem>,
    result_tx: &channel::Sender<FileRecord>,
    in_flight: &AtomicUsize,
    skipped: &AtomicUsize,
    root: &Path,
    patterns: &[String],
) {
    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(_) => {
            skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            skipped.fetch_add(1, Ordering::Relaxed);
            continue;
        };
        let path = entry.path();
        if is_excluded(&path, patterns) {
            continue;
        }

        // DirEntry::file_type does not follow symlinks; a symlink to a
        // directory is recorded as a leaf, never descended into.
        let Ok(file_type) = entry.file_type() else {
            skipped.fetch_add(1, Ordering::Relaxed);
            continue;
        };

        if file_type.is_dir() {
            in_flight.fetch_add(1, Ordering::Release);
            match work_tx.try_send(path) {
                Ok(()) => {}
                // Queue saturated: process inline rather than let every
                // worker block on a full queue with no consumer left.
                Err(channel::TrySendError::Full(dir)) => {
                    process_directory(&dir, work_tx, result_tx, in_flight, skipped, root, patterns);
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                }
                Err(channel::TrySendError::Disconnected(_)) => {
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                    return;
                }
            }
            continue;
        }

        match stat_record(&path, root) {
            Some(record) => {
                if result_tx.send(record).is_err() {
                    return;
                }
            }
            None => {
                skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Substring match of any pattern anywhere in the absolute path.
fn is_excluded(path: &Path, patterns: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    patterns.iter().any(|pattern| path_str.contains(pattern))
}

/// `lstat` one entry into a record. `None` means skip: the entry vanished,
/// could not be stat'd, or its relative path is not valid UTF-8.
fn stat_record(path: &Path, root: &Path) -> Option<FileRecord> {
    let meta = fs::symlink_metadata(path).ok()?;
    let relative_path = path.strip_prefix(root).ok()?.to_str()?.to_string();

    let mtime = meta.modified().map_or(0.0, system_time_to_epoch_secs);
    let (mode, rdev) = mode_and_rdev(&meta);

    Some(FileRecord {
        relative_path,
        mtime,
        mode,
        rdev,
    })
}

fn system_time_to_epoch_secs(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map_or_else(|err| -err.duration().as_secs_f64(), |d| d.as_secs_f64())
}

#[cfg(unix)]
fn mode_and_rdev(meta: &fs::Metadata) -> (u32, u64) {
    use std::os::unix::fs::MetadataExt;
    (meta.mode(), meta.rdev())
}

#[cfg(not(unix))]
fn mode_and_rdev(_meta: &fs::Metadata) -> (u32, u64) {
    (0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    fn collector(root: &Path, patterns: &[&str]) -> MetadataCollector {
        MetadataCollector::new(
            root.to_path_buf(),
            patterns.iter().map(ToString::to_string).collect(),
            4,
        )
    }

    #[test]
    fn collects_files_sorted_by_relative_path() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "zebra.txt", "z");
        write_file(tmp.path(), "apple.txt", "a");
        write_file(tmp.path(), "mango.txt", "m");

        let collection = collector(tmp.path(), &[]).collect().unwrap();
        let paths: Vec<&str> = collection
            .records
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["apple.txt", "mango.txt", "zebra.txt"]);
        assert_eq!(collection.files_skipped, 0);
    }

    #[test]
    fn descends_into_subdirectories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        write_file(&tmp.path().join("a/b"), "deep.txt", "x");
        write_file(tmp.path(), "top.txt", "y");

        let collection = collector(tmp.path(), &[]).collect().unwrap();
        let paths: Vec<&str> = collection
            .records
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["a/b/deep.txt", "top.txt"]);
    }

    #[test]
    fn directories_themselves_are_not_records() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("empty_dir")).unwrap();
        write_file(tmp.path(), "file.txt", "x");

        let collection = collector(tmp.path(), &[]).collect().unwrap();
        assert_eq!(collection.records.len(), 1);
        assert_eq!(collection.records[0].relative_path, "file.txt");
    }

    #[test]
    fn excluded_directories_are_pruned() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("node_modules")).unwrap();
        write_file(&tmp.path().join("node_modules"), "dep.js", "x");
        write_file(tmp.path(), "main.rs", "y");

        let collection = collector(tmp.path(), &["node_modules"]).collect().unwrap();
        let paths: Vec<&str> = collection
            .records
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["main.rs"]);
    }

    #[test]
    fn exclusion_matches_substring_anywhere() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "keep.txt", "x");
        write_file(tmp.path(), "secret_cache_file", "y");

        let collection = collector(tmp.path(), &["cache"]).collect().unwrap();
        let paths: Vec<&str> = collection
            .records
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["keep.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recorded_not_followed() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("real")).unwrap();
        write_file(&tmp.path().join("real"), "inner.txt", "x");
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();

        let collection = collector(tmp.path(), &[]).collect().unwrap();
        let paths: Vec<&str> = collection
            .records
            .iter()
            .map(|r| r.relative_path.as_str())
            .collect();
        // The symlink is a leaf; nothing under link/ appears.
        assert_eq!(paths, vec!["link", "real/inner.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn records_carry_posix_mode_bits() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "plain.txt", "x");

        let collection = collector(tmp.path(), &[]).collect().unwrap();
        let record = &collection.records[0];
        assert_eq!(record.mode & 0o170_000, 0o100_000, "regular file type bits");
        assert!(record.mtime > 0.0);
    }

    #[test]
    fn missing_root_yields_empty_collection() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("never-created");
        let collection = collector(&gone, &[]).collect().unwrap();
        assert!(collection.records.is_empty());
        assert_eq!(collection.files_skipped, 0);
    }

    #[test]
    fn repeated_collection_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        for i in 0..32 {
            write_file(tmp.path(), &format!("file_{i:02}.txt"), "x");
        }
        fs::create_dir(tmp.path().join("sub")).unwrap();
        for i in 0..32 {
            write_file(&tmp.path().join("sub"), &format!("nested_{i:02}.txt"), "y");
        }

        let first = collector(tmp.path(), &[]).collect().unwrap();
        let second = collector(tmp.path(), &[]).collect().unwrap();
        assert_eq!(first.records, second.records);
    }
}
