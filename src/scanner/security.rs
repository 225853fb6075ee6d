//! Security-relevance classification of changed paths.
//!
//! A pure, stateless rule table layered on top of the diff output: each rule
//! is an independent pattern check against the relative path and change
//! kind, severity is the maximum over all matching rules, and every match
//! contributes a human-readable reason. The classifier annotates changes;
//! it never alters the diff result.

use serde::Serialize;

use crate::scanner::diff::ChangeKind;

/// Authentication and access-control files. Matching anywhere in the path
/// is critical regardless of change kind.
const AUTH_FILES: &[&str] = &[
    "etc/passwd",
    "etc/shadow",
    "etc/sudoers",
    "etc/group",
    "etc/ssh/sshd_config",
    ".ssh/authorized_keys",
    "etc/pam.d/",
    "etc/security/",
];

/// Directory prefixes whose contents are security-sensitive.
const CRITICAL_DIRS: &[&str] = &[
    "etc/",
    "boot/",
    "root/",
    "usr/bin/",
    "usr/sbin/",
    "bin/",
    "sbin/",
    "lib/systemd/",
    "etc/systemd/",
    "etc/cron",
    "etc/init.d/",
    "home/",
    ".ssh/",
    "etc/pam.d/",
    "etc/security/",
    "usr/local/bin/",
    "usr/local/sbin/",
    "opt/",
];

/// System executable locations.
const EXEC_DIRS: &[&str] = &["bin/", "sbin/", "usr/bin/", "usr/sbin/", "usr/local/bin/"];

/// Extensions of loadable or executable artifacts.
const SUSPICIOUS_EXTS: &[&str] = &[
    ".so", ".ko", ".service", ".timer", ".socket", ".py", ".sh", ".pl",
];

/// System library locations where a suspicious extension escalates.
const LIBRARY_DIRS: &[&str] = &["etc/", "usr/lib/", "lib/"];

/// Scheduled-task and service-configuration markers.
const SCHEDULER_NEEDLES: &[&str] = &["cron", "systemd/system", "systemd/user", "init.d"];

/// Temporary directories watched for dropped scripts.
const TMP_DIRS: &[&str] = &["tmp/", "var/tmp/"];

/// Script extensions watched in temporary directories.
const TMP_SCRIPT_EXTS: &[&str] = &[".sh", ".py", ".pl", ".elf"];

/// Severity bands, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    /// No rule matched.
    Normal,
    /// Worth a look, not alarming on its own.
    Watch,
    /// Likely security-relevant.
    Suspicious,
    /// Authentication, boot, or system-executable change.
    Critical,
}

impl SeverityLevel {
    /// Band for a numeric severity (values above 3 saturate at critical).
    #[must_use]
    pub const fn from_severity(severity: u8) -> Self {
        match severity {
            0 => Self::Normal,
            1 => Self::Watch,
            2 => Self::Suspicious,
            _ => Self::Critical,
        }
    }

    /// Lowercase label used in reports and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Watch => "watch",
            Self::Suspicious => "suspicious",
            Self::Critical => "critical",
        }
    }
}

/// Per-path classification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityAssessment {
    /// 0 = normal, 1 = watch, 2 = suspicious, 3 = critical.
    pub severity: u8,
    /// `severity >= 2`.
    pub is_suspicious: bool,
    /// One entry per matched rule, in rule-table order.
    pub reasons: Vec<String>,
    /// Severity band.
    pub level: SeverityLevel,
}

/// Classify one changed path. Severity is max-wins across all rules.
#[must_use]
pub fn classify(path: &str, change: ChangeKind) -> SecurityAssessment {
    // Each matched rule contributes (severity, reason); the final severity
    // is the maximum over all matches.
    let mut matches: Vec<(u8, String)> = Vec::new();

    for auth in AUTH_FILES {
        if path.contains(auth) {
            matches.push((3, format!("Authentication/security file: {auth}")));
        }
    }

    for dir in CRITICAL_DIRS {
        if path.starts_with(dir) {
            matches.push((2, format!("Critical directory: /{dir}")));
            break;
        }
    }

    if EXEC_DIRS.iter().any(|dir| path.starts_with(dir)) {
        match change {
            ChangeKind::Added => {
                matches.push((2, "New executable in system path".to_string()));
            }
            ChangeKind::Modified => {
                matches.push((3, "Modified system executable".to_string()));
            }
            ChangeKind::Removed => {}
        }
    }

    if SUSPICIOUS_EXTS.iter().any(|ext| path.ends_with(ext))
        && LIBRARY_DIRS.iter().any(|dir| path.starts_with(dir))
    {
        matches.push((2, "Executable/module in system location".to_string()));
    }

    if change == ChangeKind::Added && path.starts_with("home/") && path.contains("/.") {
        matches.push((1, "Hidden file in home directory".to_string()));
    }

    if path.starts_with("boot/") {
        matches.push((3, "Boot directory modification".to_string()));
    }

    if SCHEDULER_NEEDLES.iter().any(|needle| path.contains(needle)) {
        matches.push((2, "Scheduled task or service configuration".to_string()));
    }

    if path.starts_with("dev/") {
        matches.push((1, "Device file change".to_string()));
    }

    if change == ChangeKind::Added
        && TMP_DIRS.iter().any(|dir| path.starts_with(dir))
        && TMP_SCRIPT_EXTS.iter().any(|ext| path.ends_with(ext))
    {
        matches.push((1, "New executable file in temporary directory".to_string()));
    }

    let severity = matches.iter().map(|(level, _)| *level).max().unwrap_or(0);
    let reasons = matches.into_iter().map(|(_, reason)| reason).collect();

    SecurityAssessment {
        severity,
        is_suspicious: severity >= 2,
        reasons,
        level: SeverityLevel::from_severity(severity),
    }
}
