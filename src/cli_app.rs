//! Top-level CLI definition and dispatch.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::json;

use fs_sentinel::core::config::Config;
use fs_sentinel::core::errors::Result;
use fs_sentinel::core::paths::resolve_absolute_path;
use fs_sentinel::logger::jsonl::{EventType, JsonlLogger, LogEntry, Severity};
use fs_sentinel::scanner::collector::MetadataCollector;
use fs_sentinel::scanner::diff::{ChangeKind, IncrementalReport, compare_incremental};
use fs_sentinel::scanner::grouping::format_grouped_changes;
use fs_sentinel::scanner::security::{SecurityAssessment, classify};
use fs_sentinel::scanner::tree::MerkleTree;
use fs_sentinel::state::{PersistedState, StateStore};

/// Noisy directories excluded by default when scanning `/`.
const NOISY_ROOT_DIRS: &[&str] = &["/run", "/tmp", "/var/tmp", "/var/cache", "/var/run"];

/// Virtual filesystems always excluded when scanning `/`.
const VIRTUAL_FS_DIRS: &[&str] = &["/proc", "/sys"];

/// fs_sentinel — Merkle-tree filesystem change detector.
#[derive(Debug, Parser)]
#[command(
    name = "fsn",
    author,
    version,
    about = "fs_sentinel - Merkle-tree filesystem change detector",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Show all changed files, fully expanded under directory nesting.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scan a directory tree and report changes since the last run.
    Scan(ScanArgs),
    /// Show the stored state summary for a target without scanning.
    Status(TargetArgs),
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Highlight security-relevant changes.
    #[arg(long)]
    security: bool,
}

#[derive(Debug, Clone, Args)]
struct TargetArgs {
    /// Root path to scan (default: current directory).
    path: Option<PathBuf>,
    /// Additional exclude patterns (repeatable).
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,
    /// Include noisy directories when scanning from /. Only virtual
    /// filesystems (/proc, /sys) stay excluded.
    #[arg(long)]
    all: bool,
}

/// Dispatch a parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    if cli.no_color {
        control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Scan(args) => run_scan(cli, &config, args),
        Command::Status(args) => run_status(cli, &config, args),
        Command::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "fsn", &mut io::stdout());
            Ok(())
        }
    }
}

/// Effective exclude patterns for a target: config defaults, root-scan
/// policy, then user additions.
fn effective_excludes(config: &Config, args: &TargetArgs, target: &Path) -> Vec<String> {
    let mut patterns = config.scanner.exclude_patterns.clone();
    if target == Path::new("/") {
        patterns.extend(VIRTUAL_FS_DIRS.iter().map(ToString::to_string));
        if !args.all {
            patterns.extend(NOISY_ROOT_DIRS.iter().map(ToString::to_string));
        }
    }
    patterns.extend(args.exclude.iter().cloned());
    patterns
}

fn run_scan(cli: &Cli, config: &Config, args: &ScanArgs) -> Result<()> {
    let target = resolve_absolute_path(args.target.path.as_deref().unwrap_or(Path::new(".")));
    let excludes = effective_excludes(config, &args.target, &target);
    let store = StateStore::new(config.paths.state_dir.clone());
    let logger = JsonlLogger::new(config.paths.jsonl_log.clone());
    let chatty = !cli.quiet && !cli.json;

    if chatty {
        println!("Scanning: {}", target.display());
        println!("Excluding patterns:");
        for pattern in &excludes {
            println!("  - {pattern}");
        }
        println!("State file: {}", store.state_file_path(&target, &excludes).display());
    }

    // Corrupt or stale state degrades to a first run; only real IO failures
    // abort here.
    let previous = match store.load(&target, &excludes) {
        Ok(previous) => previous,
        Err(err) if err.is_recoverable() => {
            if !cli.quiet {
                eprintln!("Previous state unusable ({err}); treating as first run");
            }
            logger.log(
                &LogEntry::new(EventType::StateDiscarded, Severity::Warning)
                    .with_path(target.to_string_lossy())
                    .with_error(err.code(), err.to_string()),
            );
            None
        }
        Err(err) => return Err(err),
    };

    let started = Instant::now();
    let collection = MetadataCollector::new(
        target.clone(),
        excludes.clone(),
        config.scanner.parallelism,
    )
    .collect()?;
    let files_skipped_in_scan = collection.files_skipped;
    let tree = MerkleTree::build(target.clone(), excludes.clone(), collection.records);

    if chatty {
        println!();
        println!("Files scanned: {}", tree.file_count());
        if files_skipped_in_scan > 0 {
            println!("Files skipped (unreadable or invalid): {files_skipped_in_scan}");
        }
        println!("Root hash: {}", tree.root_hash);
    }

    let report = previous.as_ref().map(|prev| compare_incremental(&tree, prev));
    if let (Some(prev), Some(report)) = (previous.as_ref(), report.as_ref()) {
        if cli.json {
            print_scan_json(&tree, Some((prev, report)));
        } else if !cli.quiet {
            print_changes(cli, config, args, prev, report, &tree, &logger);
        }
    } else if cli.json {
        print_scan_json(&tree, None);
    } else if chatty {
        println!("\nNo previous state found - this is the first run");
    }

    let state = PersistedState::snapshot(&tree);
    match store.save(&state, &target, &excludes) {
        Ok(path) => {
            if chatty {
                println!("\nState saved to: {}", path.display());
            }
            logger.log(
                &LogEntry::new(EventType::StateSaved, Severity::Info)
                    .with_path(path.to_string_lossy()),
            );
        }
        Err(err) => {
            // Losing the new state would silently break the next run's diff.
            logger.log(
                &LogEntry::new(EventType::Error, Severity::Critical)
                    .with_path(target.to_string_lossy())
                    .with_error(err.code(), err.to_string()),
            );
            return Err(err);
        }
    }

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut entry = LogEntry::new(EventType::ScanComplete, Severity::Info)
        .with_path(target.to_string_lossy())
        .with_file_count(tree.file_count())
        .with_duration_ms(duration_ms);
    if let Some(report) = &report {
        entry = entry
            .with_total_changes(report.changes.total_changes())
            .with_files_skipped(report.files_skipped);
    }
    logger.log(&entry);

    Ok(())
}

fn print_changes(
    cli: &Cli,
    config: &Config,
    args: &ScanArgs,
    previous: &PersistedState,
    report: &IncrementalReport,
    tree: &MerkleTree,
    logger: &JsonlLogger,
) {
    let separator = "=".repeat(60);
    println!("\n{separator}");
    println!("CHANGES SINCE LAST RUN");
    println!("{separator}");
    println!("Previous scan: {}", previous.timestamp);
    println!("Previous root hash: {}", previous.root_hash);
    println!("Current root hash:  {}", tree.root_hash);

    if previous.root_hash == tree.root_hash {
        println!("\nNo changes detected (root hashes match)");
        println!(
            "Skipped detailed comparison of {} files",
            tree.file_count()
        );
        return;
    }

    println!("\nTotal changes: {}", report.changes.total_changes());
    if report.files_skipped > 0 {
        println!(
            "Files skipped by Merkle tree pruning: {}/{}",
            report.files_skipped,
            tree.file_count()
        );
    }
    if !cli.verbose {
        println!("(Limited to {} output lines per section. Use -v/--verbose to see all changes)",
            config.display.max_display);
    }

    if args.security {
        print_security_analysis(cli, report, logger);
    }

    let (max_display, expand_all) = if cli.verbose {
        (usize::MAX, true)
    } else {
        (config.display.max_display, false)
    };
    let depth = config.display.group_depth;

    for (label, kind, paths) in [
        ("Added", ChangeKind::Added, &report.changes.added),
        ("Removed", ChangeKind::Removed, &report.changes.removed),
        ("Modified", ChangeKind::Modified, &report.changes.modified),
    ] {
        if paths.is_empty() {
            continue;
        }
        println!("\n[{}] {label} files ({}):", kind.symbol(), paths.len());
        for line in format_grouped_changes(paths, kind.symbol(), depth, max_display, expand_all) {
            println!("{line}");
        }
    }
}

fn print_security_analysis(cli: &Cli, report: &IncrementalReport, logger: &JsonlLogger) {
    let separator = "=".repeat(60);
    println!("\n{separator}");
    println!("SECURITY ANALYSIS");
    println!("{separator}");

    let mut critical: Vec<(ChangeKind, &String, SecurityAssessment)> = Vec::new();
    let mut suspicious: Vec<(ChangeKind, &String, SecurityAssessment)> = Vec::new();
    let mut watch: Vec<(ChangeKind, &String, SecurityAssessment)> = Vec::new();

    for (kind, paths) in [
        (ChangeKind::Added, &report.changes.added),
        (ChangeKind::Modified, &report.changes.modified),
        (ChangeKind::Removed, &report.changes.removed),
    ] {
        for path in paths {
            let assessment = classify(path, kind);
            match assessment.severity {
                3 => critical.push((kind, path, assessment)),
                2 => suspicious.push((kind, path, assessment)),
                1 => watch.push((kind, path, assessment)),
                _ => {}
            }
        }
    }

    if !critical.is_empty() {
        println!("\n{} ({}):", "CRITICAL".red().bold(), critical.len());
        for (kind, path, assessment) in &critical {
            println!("    {} {path}", kind.symbol());
            for reason in &assessment.reasons {
                println!("        -> {reason}");
            }
        }
        logger.log(
            &LogEntry::new(EventType::SecurityAlert, Severity::Critical)
                .with_total_changes(critical.len())
                .with_details("critical security-relevant changes detected"),
        );
    }

    if !suspicious.is_empty() {
        println!("\n{} ({}):", "SUSPICIOUS".yellow().bold(), suspicious.len());
        for (kind, path, assessment) in suspicious.iter().take(15) {
            println!("    {} {path}", kind.symbol());
            for reason in &assessment.reasons {
                println!("        -> {reason}");
            }
        }
        if suspicious.len() > 15 {
            println!("    ... and {} more", suspicious.len() - 15);
        }
    }

    if !watch.is_empty() && cli.verbose {
        println!("\n{} ({}):", "WATCH".cyan(), watch.len());
        for (kind, path, _) in watch.iter().take(10) {
            println!("    {} {path}", kind.symbol());
        }
        if watch.len() > 10 {
            println!("    ... and {} more", watch.len() - 10);
        }
    }

    if critical.is_empty() && suspicious.is_empty() {
        println!("\nNo critical or suspicious changes detected");
    }

    println!("\n{separator}");
    println!("ALL CHANGES");
    println!("{separator}");
}

fn print_scan_json(tree: &MerkleTree, compared: Option<(&PersistedState, &IncrementalReport)>) {
    let value = match compared {
        Some((previous, report)) => json!({
            "root_path": tree.root_path.to_string_lossy(),
            "root_hash": tree.root_hash,
            "file_count": tree.file_count(),
            "first_run": false,
            "previous_timestamp": previous.timestamp,
            "previous_root_hash": previous.root_hash,
            "report": report,
        }),
        None => json!({
            "root_path": tree.root_path.to_string_lossy(),
            "root_hash": tree.root_hash,
            "file_count": tree.file_count(),
            "first_run": true,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
}

fn run_status(cli: &Cli, config: &Config, args: &TargetArgs) -> Result<()> {
    let target = resolve_absolute_path(args.path.as_deref().unwrap_or(Path::new(".")));
    let excludes = effective_excludes(config, args, &target);
    let store = StateStore::new(config.paths.state_dir.clone());
    let state_file = store.state_file_path(&target, &excludes);

    let state = match store.load(&target, &excludes) {
        Ok(state) => state,
        Err(err) if err.is_recoverable() => {
            if !cli.quiet {
                eprintln!("Stored state unusable: {err}");
            }
            None
        }
        Err(err) => return Err(err),
    };

    if cli.json {
        let value = match &state {
            Some(state) => json!({
                "state_file": state_file.to_string_lossy(),
                "root_path": state.root_path,
                "timestamp": state.timestamp,
                "root_hash": state.root_hash,
                "file_count": state.file_count,
            }),
            None => json!({
                "state_file": state_file.to_string_lossy(),
                "recorded": false,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return Ok(());
    }

    println!("State file: {}", state_file.display());
    match state {
        Some(state) => {
            println!("Recorded root: {}", state.root_path);
            println!("Last scan:     {}", state.timestamp);
            println!("Root hash:     {}", state.root_hash);
            println!("Files tracked: {}", state.file_count);
        }
        None => println!("No state recorded for this target"),
    }
    Ok(())
}
