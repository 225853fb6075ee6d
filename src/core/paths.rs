//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Maximum length of the human-readable part of a state file name.
const STATE_NAME_MAX: usize = 50;

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve
/// symlinks and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    // Try filesystem resolution first (handles symlinks).
    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    // Fallback: syntactic normalization.
    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Turn a scan root into the readable half of a state file name.
///
/// `/` becomes `_` and spaces become `-`, truncated to 50 characters so
/// deeply nested roots stay within filename limits. The uniqueness of the
/// state file name comes from the hash prefix, not from this part.
#[must_use]
pub fn sanitize_root_for_state_file(root_path: &str) -> String {
    let sanitized: String = root_path
        .chars()
        .map(|c| match c {
            '/' => '_',
            ' ' => '-',
            other => other,
        })
        .collect();
    sanitized.chars().take(STATE_NAME_MAX).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_existing_path_canonically() {
        let cwd = env::current_dir().unwrap();
        let resolved = resolve_absolute_path(Path::new("."));
        assert_eq!(resolved, std::fs::canonicalize(&cwd).unwrap());
    }

    #[test]
    fn normalizes_nonexistent_path_syntactically() {
        // /nonexistent/foo/../bar -> /nonexistent/bar
        #[cfg(unix)]
        let root = Path::new("/");
        #[cfg(windows)]
        let root = Path::new("C:");

        let input = root.join("nonexistent").join("foo").join("..").join("bar");
        let expected = root.join("nonexistent").join("bar");

        assert!(std::fs::canonicalize(&input).is_err());

        let resolved = resolve_absolute_path(&input);
        assert_eq!(resolved, expected);
    }

    #[test]
    fn handles_parent_at_root() {
        #[cfg(unix)]
        {
            let input = Path::new("/../foo");
            let resolved = normalize_syntactic(input);
            assert_eq!(resolved, Path::new("/foo"));
        }
    }

    #[test]
    fn sanitizes_separators_and_spaces() {
        assert_eq!(
            sanitize_root_for_state_file("/var/my data"),
            "_var_my-data"
        );
    }

    #[test]
    fn sanitized_name_is_truncated() {
        let long = format!("/{}", "a".repeat(100));
        let sanitized = sanitize_root_for_state_file(&long);
        assert_eq!(sanitized.chars().count(), 50);
        assert!(sanitized.starts_with("_aaa"));
    }
}
