//! Leaf and internal-node hashing for the metadata Merkle tree.
//!
//! Leaf digests are derived from file *metadata*, never from content: a
//! regular file hashes its path and mtime, a block/char device hashes its
//! path and major/minor numbers (device nodes have no meaningful mtime).
//! All digests are SHA-256, rendered as lowercase hex, and internal nodes
//! hash the *hex strings* of their children — the hex-string convention is
//! what keeps root hashes reproducible across implementations.

use sha2::{Digest, Sha256};

use crate::scanner::collector::FileRecord;

/// POSIX file-type mask and the two device types.
const S_IFMT: u32 = 0o170_000;
const S_IFBLK: u32 = 0o060_000;
const S_IFCHR: u32 = 0o020_000;

/// Whether the mode bits describe a block or character device.
#[must_use]
pub const fn is_device_mode(mode: u32) -> bool {
    matches!(mode & S_IFMT, S_IFBLK | S_IFCHR)
}

/// SHA-256 of a UTF-8 string, as lowercase hex.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();

    use std::fmt::Write;
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Hash one file record into its leaf digest.
///
/// Device files hash `"{path}:dev:{major}:{minor}"`; everything else
/// (regular files, symlinks, fifos, sockets) hashes `"{path}:{mtime}"` with
/// mtime fixed to six decimal places so float formatting cannot drift
/// between runs.
#[must_use]
pub fn leaf_hash(record: &FileRecord) -> String {
    let input = if is_device_mode(record.mode) {
        let major = (record.rdev >> 8) & 0xff;
        let minor = record.rdev & 0xff;
        format!("{}:dev:{major}:{minor}", record.relative_path)
    } else {
        format!("{}:{:.6}", record.relative_path, record.mtime)
    };
    sha256_hex(&input)
}

/// Hash two child digests into their parent digest.
///
/// Plain hex-string concatenation, not byte-wise concat.
#[must_use]
pub fn internal_hash(left_hex: &str, right_hex: &str) -> String {
    let mut input = String::with_capacity(left_hex.len() + right_hex.len());
    input.push_str(left_hex);
    input.push_str(right_hex);
    sha256_hex(&input)
}

/// Root hash of an empty file set.
#[must_use]
pub fn empty_root_hash() -> String {
    sha256_hex("empty")
}
