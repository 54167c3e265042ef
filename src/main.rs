//! fsinventory - concurrent file system inventory.
//!
//! Usage:
//!   fsinv PATH                      Walk PATH and write an inventory report
//!   fsinv PATH --exclude cache      Do not descend into paths containing "cache"
//!   fsinv PATH --config fsinv.toml  Read exclusions and policy from a file
//!   fsinv --help                    Show help

mod report;
mod settings;

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};
use color_eyre::eyre::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use fsinventory_scan::{
    ProgressSnapshot, ScanError, TreeWalker, WalkConfig, WalkOutcome, normalize_root,
};
use settings::{Overrides, Settings};

#[derive(Parser)]
#[command(
    name = "fsinv",
    version,
    about = "Walk a directory tree and inventory every entry",
    long_about = "fsinv lists every file, directory and reparse point beneath a root \
                  directory, one concurrent unit per directory, and writes the result \
                  to a timestamped JSON report."
)]
struct Cli {
    /// Root directory to walk (surrounding quotes are stripped)
    path: Option<String>,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not descend into directories whose path contains this text (repeatable, case-insensitive)
    #[arg(short, long = "exclude", value_name = "TEXT")]
    exclude: Vec<String>,

    /// Abort the walk on the first permission error instead of skipping it
    #[arg(long)]
    abort_on_permission_denied: bool,

    /// Abort the walk on the first path-too-long error instead of skipping it
    #[arg(long)]
    abort_on_path_too_long: bool,

    /// Seconds between progress lines (0 disables)
    #[arg(long, value_name = "SECS")]
    progress_secs: Option<u64>,

    /// Grace period in seconds before the walk is declared finished
    #[arg(long, value_name = "SECS")]
    settle_secs: Option<u64>,

    /// Directory the report is written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Walk and print the summary without writing a report
    #[arg(long)]
    no_report: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            exclusions: self.exclude.clone(),
            abort_on_permission_denied: self.abort_on_permission_denied,
            abort_on_path_too_long: self.abort_on_path_too_long,
            progress_secs: self.progress_secs,
            settle_secs: self.settle_secs,
            output_dir: self.output_dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let Some(raw_path) = cli.path.as_deref() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let root = normalize_root(raw_path);
    let root = std::path::absolute(&root)
        .wrap_err_with(|| format!("Invalid path {}", root.display()))?;
    if !root.is_dir() {
        warn!(path = %root.display(), "Directory does not exist, nothing to do");
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let overrides = cli.overrides();
    let config = settings.walk_config(root, &overrides)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("fsinv-worker")
        .build()
        .wrap_err("Failed to start runtime")?;

    let started = chrono::Utc::now();
    let outcome = match runtime.block_on(run_walk(&config)) {
        Ok(outcome) => outcome,
        Err(err @ (ScanError::NotFound { .. } | ScanError::NotADirectory { .. }))
            if err.path() == Some(config.root.as_path()) =>
        {
            warn!(path = %config.root.display(), "Root vanished before the walk started");
            return Ok(());
        }
        Err(err) => {
            log_fatal(&err);
            return Err(err).wrap_err_with(|| format!("Walk of {} aborted", config.root.display()));
        }
    };

    print_summary(&outcome);

    if !cli.no_report {
        let output_dir = settings.output_dir(&overrides);
        let path = report::write_report(&outcome, &output_dir, started)
            .wrap_err("Failed to write inventory report")?;
        info!(path = %path.display(), "Report written");
        eprintln!("Report written to {}", path.display());
    }

    Ok(())
}

async fn run_walk(config: &WalkConfig) -> Result<WalkOutcome, ScanError> {
    TreeWalker::new()
        .walk_with_sink(config, print_progress)
        .await
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();
}

/// Log the propagated fatal error with the same context units log with.
fn log_fatal(err: &ScanError) {
    let current = std::thread::current();
    error!(
        thread = ?current.id(),
        thread_name = current.name().unwrap_or("<unnamed>"),
        method = "main",
        path = %err.path().map(|p| p.display().to_string()).unwrap_or_default(),
        class = %err.class(),
        error = %err.chain_message(),
        "Unhandled walk failure"
    );
}

fn print_progress(snapshot: &ProgressSnapshot) {
    eprintln!(
        "[{:>6.0}s] {} entries ({:.0}/s), {} units pending, at {}",
        snapshot.elapsed.as_secs_f64(),
        snapshot.entries_discovered,
        snapshot.entries_per_second(),
        snapshot.units_pending(),
        snapshot.current_path.display()
    );
}

fn print_summary(outcome: &WalkOutcome) {
    let summary = &outcome.summary;

    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} - {}",
        outcome.root.display(),
        humansize::format_size(summary.total_bytes, humansize::BINARY)
    );
    println!(
        " {} entries: {} files, {} directories, {} reparse points",
        summary.entries, summary.files, summary.directories, summary.reparse_points
    );
    println!(
        " Walked in {:.2}s using {} units",
        summary.elapsed.as_secs_f64(),
        summary.units
    );
    if summary.missing > 0 {
        println!(" {} entries vanished during the walk", summary.missing);
    }
    if summary.skipped_errors > 0 {
        println!(" {} error(s) skipped", summary.skipped_errors);
    }
    println!("{}", "─".repeat(60));
}
