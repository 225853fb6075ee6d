//! FSN-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FsnError>;

/// Top-level error type for fs_sentinel.
#[derive(Debug, Error)]
pub enum FsnError {
    #[error("[FSN-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FSN-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FSN-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FSN-2001] path is not valid UTF-8: {path}")]
    PathEncoding { path: PathBuf },

    #[error("[FSN-2002] file access failure for {path}: {details}")]
    FileAccess { path: PathBuf, details: String },

    #[error("[FSN-2101] corrupt state file in {context}: {details}")]
    StateCorrupt {
        context: &'static str,
        details: String,
    },

    #[error("[FSN-2102] stale state file: scanned {expected}, state records {found}")]
    StateStale { expected: String, found: String },

    #[error("[FSN-2103] state write failure at {path}: {source}")]
    StateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FSN-2104] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FSN-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[FSN-3002] channel closed in component {component}")]
    ChannelClosed { component: &'static str },
}

impl FsnError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FSN-1001",
            Self::MissingConfig { .. } => "FSN-1002",
            Self::ConfigParse { .. } => "FSN-1003",
            Self::PathEncoding { .. } => "FSN-2001",
            Self::FileAccess { .. } => "FSN-2002",
            Self::StateCorrupt { .. } => "FSN-2101",
            Self::StateStale { .. } => "FSN-2102",
            Self::StateWrite { .. } => "FSN-2103",
            Self::Serialization { .. } => "FSN-2104",
            Self::Io { .. } => "FSN-3001",
            Self::ChannelClosed { .. } => "FSN-3002",
        }
    }

    /// Whether the failure degrades to a recoverable condition.
    ///
    /// Per-file errors are recovered as skip counts; state load failures are
    /// recovered as "no previous state" (first run). Nothing is retried.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PathEncoding { .. }
                | Self::FileAccess { .. }
                | Self::StateCorrupt { .. }
                | Self::StateStale { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for state write failures with a known path.
    #[must_use]
    pub fn state_write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::StateWrite {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for FsnError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FsnError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_errors() -> Vec<FsnError> {
        vec![
            FsnError::InvalidConfig {
                details: String::new(),
            },
            FsnError::MissingConfig {
                path: PathBuf::new(),
            },
            FsnError::ConfigParse {
                context: "",
                details: String::new(),
            },
            FsnError::PathEncoding {
                path: PathBuf::new(),
            },
            FsnError::FileAccess {
                path: PathBuf::new(),
                details: String::new(),
            },
            FsnError::StateCorrupt {
                context: "",
                details: String::new(),
            },
            FsnError::StateStale {
                expected: String::new(),
                found: String::new(),
            },
            FsnError::StateWrite {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            FsnError::Serialization {
                context: "",
                details: String::new(),
            },
            FsnError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            FsnError::ChannelClosed { component: "" },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_errors();
        let codes: Vec<&str> = errors.iter().map(FsnError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_fsn_prefix() {
        for err in &all_errors() {
            assert!(
                err.code().starts_with("FSN-"),
                "code {} must start with FSN-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = FsnError::StateCorrupt {
            context: "state_load",
            details: "truncated".to_string(),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("FSN-2101"),
            "display should contain error code: {msg}"
        );
        assert!(
            msg.contains("truncated"),
            "display should contain details: {msg}"
        );
    }

    #[test]
    fn recoverable_errors_degrade_not_fail() {
        assert!(
            FsnError::StateCorrupt {
                context: "",
                details: String::new()
            }
            .is_recoverable()
        );
        assert!(
            FsnError::StateStale {
                expected: String::new(),
                found: String::new()
            }
            .is_recoverable()
        );
        assert!(
            FsnError::PathEncoding {
                path: PathBuf::new()
            }
            .is_recoverable()
        );
        assert!(
            FsnError::FileAccess {
                path: PathBuf::new(),
                details: String::new()
            }
            .is_recoverable()
        );

        // State writes are fatal for the run.
        assert!(
            !FsnError::StateWrite {
                path: PathBuf::new(),
                source: std::io::Error::other("disk full"),
            }
            .is_recoverable()
        );
        assert!(
            !FsnError::InvalidConfig {
                details: String::new()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = FsnError::io(
            "/tmp/test.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "FSN-3001");
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: FsnError = json_err.into();
        assert_eq!(err.code(), "FSN-2104");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: FsnError = toml_err.into();
        assert_eq!(err.code(), "FSN-1003");
    }
}
