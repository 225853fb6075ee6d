//! Directory-prefix grouping and truncated rendering of change lists.
//!
//! Pure formatting over relative `/`-separated paths. Grouping collapses a
//! large change list into directory buckets; rendering prints a bounded
//! number of lines and closes with a `"... and N more"` sentinel when the
//! cap is reached.

use std::collections::BTreeMap;

/// Group paths by directory prefix.
///
/// Paths at most `max_depth` components deep are keyed by their parent
/// directory (single-component paths by themselves); deeper paths are keyed
/// by their first `max_depth` components.
#[must_use]
pub fn group_by_directory(paths: &[String], max_depth: usize) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for path in paths {
        let parts: Vec<&str> = path.split('/').collect();
        let key = if parts.len() <= max_depth {
            if parts.len() == 1 {
                path.clone()
            } else {
                parts[..parts.len() - 1].join("/")
            }
        } else {
            parts[..max_depth].join("/")
        };
        groups.entry(key).or_default().push(path.clone());
    }

    groups
}

/// Render a change list as indented display lines.
///
/// Groups print in sorted directory order. A singleton group prints the full
/// path; a group of at most three files (or any group when `expand_all`)
/// prints a header plus directory-relative entries; larger groups print a
/// header with a count. Once `max_display` lines exist, rendering stops and
/// a sentinel line reports how many files were not shown.
#[must_use]
pub fn format_grouped_changes(
    paths: &[String],
    symbol: char,
    max_depth: usize,
    max_display: usize,
    expand_all: bool,
) -> Vec<String> {
    if paths.is_empty() {
        return Vec::new();
    }

    let groups = group_by_directory(paths, max_depth);
    let mut output = Vec::new();
    let mut total_shown = 0usize;

    for (directory, dir_files) in &groups {
        if dir_files.len() == 1 {
            output.push(format!("    {symbol} {}", dir_files[0]));
            total_shown += 1;
        } else if expand_all || dir_files.len() <= 3 {
            output.push(format!(
                "    {symbol} {directory}/ ({} files):",
                dir_files.len()
            ));
            let mut sorted = dir_files.clone();
            sorted.sort_unstable();
            for file in &sorted {
                let relative = file
                    .strip_prefix(&format!("{directory}/"))
                    .unwrap_or(file);
                output.push(format!("        {symbol} {relative}"));
            }
            total_shown += dir_files.len();
        } else {
            output.push(format!(
                "    {symbol} {directory}/ ({} files)",
                dir_files.len()
            ));
            total_shown += dir_files.len();
        }

        if output.len() >= max_display {
            let remaining = paths.len().saturating_sub(total_shown);
            if remaining > 0 {
                output.push(format!(
                    "    ... and {remaining} more files in other directories"
                ));
            }
            break;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_component_path_groups_by_itself() {
        let groups = group_by_directory(&paths(&["README.md"]), 3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["README.md"], paths(&["README.md"]));
    }

    #[test]
    fn shallow_paths_group_by_parent() {
        let groups = group_by_directory(&paths(&["etc/passwd", "etc/shadow"]), 3);
        assert_eq!(groups["etc"], paths(&["etc/passwd", "etc/shadow"]));
    }

    #[test]
    fn deep_paths_group_by_depth_prefix() {
        let groups = group_by_directory(
            &paths(&[
                "usr/share/doc/pkg-a/README",
                "usr/share/doc/pkg-b/README",
            ]),
            3,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["usr/share/doc"].len(), 2);
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(format_grouped_changes(&[], '+', 3, 20, false).is_empty());
    }

    #[test]
    fn singleton_group_prints_full_path() {
        let lines = format_grouped_changes(&paths(&["etc/hostname"]), '*', 3, 20, false);
        assert_eq!(lines, vec!["    * etc/hostname".to_string()]);
    }

    #[test]
    fn small_group_expands_with_relative_entries() {
        let lines = format_grouped_changes(
            &paths(&["etc/passwd", "etc/shadow"]),
            '*',
            3,
            20,
            false,
        );
        assert_eq!(lines[0], "    * etc/ (2 files):");
        assert_eq!(lines[1], "        * passwd");
        assert_eq!(lines[2], "        * shadow");
    }

    #[test]
    fn large_group_collapses_to_count() {
        let many: Vec<String> = (0..6).map(|i| format!("var/log/app_{i}.log")).collect();
        let lines = format_grouped_changes(&many, '+', 3, 20, false);
        assert_eq!(lines, vec!["    + var/log/ (6 files)".to_string()]);
    }

    #[test]
    fn expand_all_overrides_collapsing() {
        let many: Vec<String> = (0..6).map(|i| format!("var/log/app_{i}.log")).collect();
        let lines = format_grouped_changes(&many, '+', 3, 100, true);
        assert_eq!(lines[0], "    + var/log/ (6 files):");
        assert_eq!(lines.len(), 7);
        assert!(lines[1].ends_with("app_0.log"));
    }

    #[test]
    fn truncation_appends_sentinel() {
        // Forty singleton groups, cap at five lines.
        let many: Vec<String> = (0..40).map(|i| format!("d{i:02}/file")).collect();
        let lines = format_grouped_changes(&many, '-', 3, 5, false);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5], "    ... and 35 more files in other directories");
    }

    #[test]
    fn no_sentinel_when_everything_fits() {
        let lines = format_grouped_changes(&paths(&["a/file", "b/file"]), '+', 3, 20, false);
        assert!(lines.iter().all(|l| !l.contains("more files")));
    }

    #[test]
    fn groups_render_in_sorted_directory_order() {
        let lines = format_grouped_changes(
            &paths(&["zeta/file", "alpha/file", "mid/file"]),
            '+',
            3,
            20,
            false,
        );
        assert_eq!(
            lines,
            vec![
                "    + alpha/file".to_string(),
                "    + mid/file".to_string(),
                "    + zeta/file".to_string(),
            ]
        );
    }
}
