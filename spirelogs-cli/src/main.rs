mod report;
mod scheduler;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use scheduler::{PoolConfig, run_pool};
use spirelogs_core::{Classifier, MissingKeyPolicy, ReferenceTables, reduce};

#[derive(Debug, Parser)]
#[command(name = "spirelogs", version = "0.1.0")]
#[command(about = "Filter modded runs out of Spire telemetry and aggregate the rest into frequency distributions")]
struct Args {
    /// Directory containing the run-log files
    input_dir: PathBuf,

    /// Path for the aggregated snapshot
    #[arg(long, default_value = "spire_snapshot.json")]
    output: PathBuf,

    /// Reference tables JSON (defaults to the embedded table set)
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Worker count (0 = one per available core)
    #[arg(long, default_value_t = 0)]
    jobs: usize,

    /// Emit a progress line every N completed files
    #[arg(long, default_value_t = 500)]
    progress_every: usize,

    /// Treat missing client flags (chose_seed, is_beta, ...) as already invalid
    #[arg(long)]
    strict_missing: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("{}", "Spirelogs Aggregation Pipeline".bright_cyan().bold());
    println!("{}", "==============================".cyan());

    let start_time = Instant::now();

    // The only fatal condition in steady operation: nothing to read.
    if !args.input_dir.is_dir() {
        bail!(
            "input path is not a directory: {}",
            args.input_dir.display()
        );
    }

    let tables = load_tables(&args)?;
    let policy = if args.strict_missing {
        MissingKeyPolicy::Strict
    } else {
        MissingKeyPolicy::Lenient
    };
    let classifier = Classifier::new(tables).with_policy(policy);

    let files = collect_files(&args.input_dir)?;
    if files.is_empty() {
        warn!("no files found in {}", args.input_dir.display());
        return Ok(());
    }
    info!(
        "found {} files in {}",
        files.len(),
        args.input_dir.display()
    );

    let config = PoolConfig {
        jobs: args.jobs,
        progress_every: args.progress_every,
    };
    let results = run_pool(&files, &classifier, &config)?;

    let global = reduce(&results);
    report::log_summary(&global);
    report::write_snapshot(&args.output, &global)?;
    info!("snapshot written to {}", args.output.display());
    info!(
        "total processing time: {:.2} seconds",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

fn load_tables(args: &Args) -> Result<ReferenceTables> {
    match &args.tables {
        Some(path) => {
            info!("loading reference tables from {}", path.display());
            ReferenceTables::from_path(path)
                .with_context(|| format!("loading tables from {}", path.display()))
        }
        None => Ok(ReferenceTables::builtin().clone()),
    }
}

/// Non-recursive listing of plain files, sorted for a stable submission
/// order. Subdirectories and other entries are skipped with a note.
fn collect_files(dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("listing input directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.context("reading directory entry")?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            warn!("skipping non-file entry {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}
