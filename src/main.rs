//! dirsight - disk usage tree that stays in sync with the filesystem.
//!
//! Usage:
//!   dirsight [PATH]            Scan and show summary
//!   dirsight scan [PATH]       Scan and show summary
//!   dirsight export [PATH]     Export scan to JSON
//!   dirsight watch [PATH]      Show the tree and rescan on changes
//!   dirsight --help            Show help

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use dirsight_core::{DirectoryTree, ScanConfig, ScanOutcome, format_size, parse_size};
use dirsight_scan::{ScanEvent, ScanSession};
use dirsight_view::{
    ExpansionState, SortColumn, SortSpec, SyncCommand, SyncConfig, SyncDriver, SyncUpdate,
    ViewNode, project,
};

#[derive(Parser)]
#[command(
    name = "dirsight",
    version,
    about = "Disk usage tree that stays in sync with the filesystem",
    long_about = "dirsight shows where your disk space goes.\n\n\
                  Run `dirsight [PATH]` for a one-off summary, or \
                  `dirsight watch [PATH]` to keep it up to date as files change."
)]
struct Cli {
    /// Path to analyze (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    #[command(flatten)]
    scan: ScanArgs,

    #[command(flatten)]
    display: DisplayArgs,

    /// Log more (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan and show summary
    Scan {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Export scan results to JSON
    Export {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the tree and rescan whenever something below it changes
    Watch {
        /// Path to watch
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        display: DisplayArgs,

        /// Milliseconds without changes before rescanning
        #[arg(long, default_value = "1500")]
        settle: u64,

        /// Milliseconds a directory must stay quiet before it counts as changed
        #[arg(long, default_value = "500")]
        debounce: u64,
    },
}

/// Options controlling the scan itself.
#[derive(Args, Debug, Clone, Default)]
struct ScanArgs {
    /// Follow symbolic links to directories
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Descend into directories on other filesystems
    #[arg(long)]
    cross_filesystems: bool,

    /// Count allocated disk blocks instead of file length
    #[arg(long)]
    physical: bool,

    /// Skip entries whose name matches this glob (repeatable)
    #[arg(short, long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Skip hidden entries
    #[arg(long)]
    no_hidden: bool,

    /// Count a file with several hard links only once
    #[arg(long)]
    dedupe_hardlinks: bool,

    /// Scanning threads (0 = one per core)
    #[arg(short = 'j', long, env = "DIRSIGHT_SCAN_THREADS", default_value = "0")]
    threads: usize,
}

impl ScanArgs {
    fn to_config(&self, root: &Path) -> Result<ScanConfig> {
        ScanConfig::builder()
            .root(root)
            .follow_symlinks(self.follow_symlinks)
            .cross_filesystems(self.cross_filesystems)
            .apparent_size(!self.physical)
            .ignore_patterns(self.exclude.clone())
            .include_hidden(!self.no_hidden)
            .dedupe_hardlinks(self.dedupe_hardlinks)
            .threads(self.threads)
            .build()
            .context("Invalid scan options")
    }
}

/// Options controlling how the tree is printed.
#[derive(Args, Debug, Clone)]
struct DisplayArgs {
    /// Maximum depth to display
    #[arg(short, long, default_value = "3")]
    depth: usize,

    /// Show all levels (no depth limit on display)
    #[arg(short, long)]
    all: bool,

    /// Number of top entries to show per directory
    #[arg(short = 'n', long, default_value = "10")]
    top: usize,

    /// Sort column: name, size, percent, files or path
    #[arg(short, long, default_value = "size")]
    sort: SortColumn,

    /// Sort ascending instead of descending
    #[arg(long)]
    asc: bool,

    /// Hide directories smaller than this (e.g. "10MB")
    #[arg(long, value_name = "SIZE")]
    min_size: Option<String>,

    /// List directories that could not be scanned
    #[arg(long)]
    errors: bool,
}

impl DisplayArgs {
    fn sort_spec(&self) -> SortSpec {
        SortSpec {
            column: self.sort,
            descending: !self.asc,
        }
    }

    fn max_depth(&self) -> usize {
        if self.all { usize::MAX } else { self.depth }
    }

    fn min_bytes(&self) -> Result<u64> {
        match &self.min_size {
            Some(text) => parse_size(text).with_context(|| format!("Invalid size {text:?}")),
            None => Ok(0),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Command::Scan {
            path,
            scan,
            display,
        }) => run_scan(&path, &scan, &display).await,
        Some(Command::Export { path, scan, output }) => run_export(&path, &scan, output).await,
        Some(Command::Watch {
            path,
            scan,
            display,
            settle,
            debounce,
        }) => {
            let timing = (
                Duration::from_millis(settle),
                Duration::from_millis(debounce),
            );
            run_watch(&path, &scan, &display, timing).await
        }
        None => run_scan(&cli.path, &cli.scan, &cli.display).await,
    }
}

/// Log to stderr, filtered by RUST_LOG or the verbosity flag.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Scan on a background task, showing progress. Ctrl-C cancels.
async fn scan_tree(config: ScanConfig) -> Result<DirectoryTree> {
    let mut session = ScanSession::new();
    let mut events = session.start(config);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                session.cancel();
            }
            event = events.recv() => match event {
                Some(ScanEvent::Progress(progress)) => {
                    eprint!(
                        "\r  {} files, {}...",
                        progress.files_scanned,
                        format_size(progress.bytes_scanned)
                    );
                }
                Some(ScanEvent::Finished(result)) => {
                    eprint!("\r\x1b[K");
                    return match result.context("Scan failed")? {
                        ScanOutcome::Complete(tree) => Ok(tree),
                        ScanOutcome::Cancelled => bail!("Scan cancelled"),
                    };
                }
                None => bail!("Scan task stopped unexpectedly"),
            }
        }
    }
}

/// Run a scan and display summary.
async fn run_scan(path: &Path, scan: &ScanArgs, display: &DisplayArgs) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let min_bytes = display.min_bytes()?;

    eprintln!("Scanning {}...", path.display());
    let tree = scan_tree(scan.to_config(&path)?).await?;

    print_summary(&tree);

    let mut expansion = ExpansionState::new();
    expansion.expand_all(&tree.root);
    let view = project(&tree.root, display.sort_spec(), &expansion);
    for line in render_tree(&view, display.max_depth(), display.top, min_bytes) {
        println!("{line}");
    }

    print_errors(&tree, display.errors);
    Ok(())
}

/// Export scan results to JSON.
async fn run_export(path: &Path, scan: &ScanArgs, output: Option<PathBuf>) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;

    eprintln!("Scanning {}...", path.display());
    let tree = scan_tree(scan.to_config(&path)?).await?;

    let json = serde_json::to_string_pretty(&tree)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Keep printing the tree as it changes, until Ctrl-C.
async fn run_watch(
    path: &Path,
    scan: &ScanArgs,
    display: &DisplayArgs,
    (settle, debounce): (Duration, Duration),
) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let min_bytes = display.min_bytes()?;

    let config = SyncConfig::builder()
        .settle(settle)
        .debounce(debounce)
        .scan(scan.to_config(&path)?)
        .sort(display.sort_spec())
        .build()
        .context("Invalid watch options")?;

    let (handle, mut updates) = SyncDriver::spawn(config).context("Failed to start watcher")?;
    handle.send(SyncCommand::SetRoot(path.clone())).await;
    eprintln!("Watching {} (Ctrl-C to stop)", path.display());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            update = updates.recv() => match update {
                Some(SyncUpdate::Progress(progress)) => {
                    eprint!("\r  {} files...", progress.files_scanned);
                }
                Some(SyncUpdate::Projection(Some(view))) => {
                    eprint!("\r\x1b[K");
                    println!("{}", "─".repeat(60));
                    for line in render_tree(&view, display.max_depth(), display.top, min_bytes) {
                        println!("{line}");
                    }
                }
                Some(SyncUpdate::Projection(None)) | Some(SyncUpdate::Cancelled) => {}
                Some(SyncUpdate::ScanFailed(message)) => {
                    eprintln!("\rScan failed: {message}");
                }
                None => break,
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn print_summary(tree: &DirectoryTree) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        tree.root_path().display(),
        format_size(tree.total_size())
    );
    println!(
        " {} files, {} directories",
        tree.stats.total_files, tree.stats.total_dirs
    );
    println!(" Scanned in {:.2}s", tree.scan_duration.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();
}

fn print_errors(tree: &DirectoryTree, list: bool) {
    let errored = tree.root.errored_nodes();
    if errored.is_empty() {
        return;
    }

    println!();
    if list {
        println!("{} directories could not be scanned:", errored.len());
        for node in errored {
            let message = node.scan_error.as_deref().unwrap_or_default();
            println!("  ! {}: {}", node.path.display(), message);
        }
    } else {
        println!(
            "{} directories could not be scanned (marked !, see --errors)",
            errored.len()
        );
    }
}

/// Render a projection as indented lines, `top` children per directory.
fn render_tree(view: &ViewNode, max_depth: usize, top: usize, min_bytes: u64) -> Vec<String> {
    let mut lines = Vec::new();
    render_node(view, 0, max_depth, top, min_bytes, &mut lines);
    lines
}

fn render_node(
    node: &ViewNode,
    depth: usize,
    max_depth: usize,
    top: usize,
    min_bytes: u64,
    lines: &mut Vec<String>,
) {
    lines.push(render_row(node, depth));

    if depth >= max_depth {
        return;
    }

    let shown: Vec<&ViewNode> = node
        .children
        .iter()
        .filter(|child| child.size >= min_bytes || child.is_errored())
        .collect();
    let remaining = shown.len().saturating_sub(top);

    for child in shown.into_iter().take(top) {
        render_node(child, depth + 1, max_depth, top, min_bytes, lines);
    }

    if remaining > 0 {
        let indent = "  ".repeat(depth + 1);
        lines.push(format!("{}  ... and {} more", indent, remaining));
    }
}

fn render_row(node: &ViewNode, depth: usize) -> String {
    let indent = "  ".repeat(depth);

    let marker = if node.is_errored() {
        "! "
    } else if node.children.is_empty() {
        "  "
    } else {
        "▼ "
    };

    let name = if depth == 0 {
        node.path.display().to_string()
    } else {
        format!("{}/", node.name)
    };

    let (percent, bar) = match node.percent_of_parent {
        Some(p) => (format!("{p:>5.1}%"), make_bar(p / 100.0, 10)),
        None => ("     -".to_string(), make_bar(0.0, 10)),
    };

    format!(
        "{}{}{:<40} {:>10} {} {}",
        indent,
        marker,
        truncate(&name, 40),
        node.display_size(),
        percent,
        bar
    )
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}
