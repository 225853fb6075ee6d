//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{FsnError, Result};

/// Full fsn configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub display: DisplayConfig,
    pub paths: PathsConfig,
}

/// Scan behavior: exclusion patterns and collector parallelism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Substring patterns; a path matching any of them is pruned.
    pub exclude_patterns: Vec<String>,
    /// Worker threads for the metadata collector.
    pub parallelism: usize,
}

/// Change-report rendering knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Directory levels used when grouping changed paths.
    pub group_depth: usize,
    /// Output lines per change section before truncation.
    pub max_display: usize,
}

/// Filesystem paths used by fsn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub state_dir: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: vec![
                ".git".to_string(),
                "__pycache__".to_string(),
                ".cache".to_string(),
                "node_modules".to_string(),
            ],
            parallelism: 16,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            group_depth: 3,
            max_display: 20,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[FSN-CONFIG] WARNING: HOME not set, falling back to /tmp for paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let config_dir = home_dir.join(".config");
        let data_dir = home_dir.join(".local").join("share").join("fsn");
        Self {
            config_file: config_dir.join("fsn").join("config.toml"),
            state_dir: config_dir.join("merkle_tree"),
            jsonl_log: data_dir.join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FsnError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FsnError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_usize("FSN_SCANNER_PARALLELISM", &mut self.scanner.parallelism)?;
        set_env_usize("FSN_DISPLAY_GROUP_DEPTH", &mut self.display.group_depth)?;
        set_env_usize("FSN_DISPLAY_MAX_DISPLAY", &mut self.display.max_display)?;
        set_env_path("FSN_STATE_DIR", &mut self.paths.state_dir);
        set_env_path("FSN_JSONL_LOG", &mut self.paths.jsonl_log);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.scanner.parallelism == 0 {
            return Err(FsnError::InvalidConfig {
                details: "scanner.parallelism must be at least 1".to_string(),
            });
        }
        if self.display.group_depth == 0 {
            return Err(FsnError::InvalidConfig {
                details: "display.group_depth must be at least 1".to_string(),
            });
        }
        if self.display.max_display == 0 {
            return Err(FsnError::InvalidConfig {
                details: "display.max_display must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn set_env_usize(key: &str, target: &mut usize) -> Result<()> {
    if let Ok(raw) = env::var(key) {
        *target = raw.parse().map_err(|_| FsnError::InvalidConfig {
            details: format!("{key} must be an unsigned integer, got {raw:?}"),
        })?;
    }
    Ok(())
}

fn set_env_path(key: &str, target: &mut PathBuf) {
    if let Some(raw) = env::var_os(key) {
        *target = PathBuf::from(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.scanner.parallelism, 16);
        assert_eq!(cfg.display.max_display, 20);
        assert_eq!(cfg.display.group_depth, 3);
        assert!(
            cfg.scanner
                .exclude_patterns
                .iter()
                .any(|p| p == "node_modules")
        );
    }

    #[test]
    fn default_state_dir_is_merkle_tree() {
        let cfg = Config::default();
        assert!(cfg.paths.state_dir.ends_with("merkle_tree"));
    }

    #[test]
    fn parses_partial_toml() {
        let raw = r#"
[scanner]
parallelism = 4

[display]
max_display = 5
"#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.scanner.parallelism, 4);
        assert_eq!(cfg.display.max_display, 5);
        // Unspecified sections keep defaults.
        assert_eq!(cfg.display.group_depth, 3);
        assert!(!cfg.scanner.exclude_patterns.is_empty());
    }

    #[test]
    fn zero_parallelism_rejected() {
        let cfg: Config = toml::from_str("[scanner]\nparallelism = 0\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "FSN-1001");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/fsn-config.toml"))).unwrap_err();
        assert_eq!(err.code(), "FSN-1002");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[scanner]\nexclude_patterns = [\"target\"]\n").unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.scanner.exclude_patterns, vec!["target".to_string()]);
        assert_eq!(cfg.paths.config_file, path);
    }
}
