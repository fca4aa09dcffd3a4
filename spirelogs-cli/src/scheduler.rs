//! Fixed-size worker pool over the file list.
//!
//! One task per file, shared-nothing: each worker maps a path to an
//! independent result value, and all mutable bookkeeping (the completion
//! counter driving progress lines) lives here in the pool layer. A panicking
//! task is converted to a file error so it can neither terminate the pool nor
//! lose the results of other tasks.

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use spirelogs_core::{Classifier, FileError, RunTally, process_file};

/// Pool sizing and progress cadence.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Worker count; `0` lets the pool match the available parallelism.
    pub jobs: usize,
    /// Emit a progress line every this many completed files.
    pub progress_every: usize,
}

/// Dispatch one worker invocation per file across a fixed-size pool and
/// collect every per-file result. Completion order is independent of
/// submission order; the caller's reduction does not care.
///
/// # Errors
///
/// Fails only if the thread pool itself cannot be built.
pub fn run_pool(
    files: &[PathBuf],
    classifier: &Classifier,
    config: &PoolConfig,
) -> Result<Vec<Result<RunTally, FileError>>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()
        .context("building worker thread pool")?;

    info!(
        "processing {} files across {} workers",
        files.len(),
        pool.current_num_threads()
    );

    let total = files.len();
    let cadence = config.progress_every.max(1);
    let completed = AtomicUsize::new(0);

    let results = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let result = run_one(path, classifier);
                if let Err(e) = &result {
                    warn!("{e}");
                }
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % cadence == 0 || done == total {
                    info!("progress: {done}/{total} files completed");
                }
                result
            })
            .collect()
    });

    Ok(results)
}

/// Run one file worker, converting a panic into a per-file error.
fn run_one(path: &std::path::Path, classifier: &Classifier) -> Result<RunTally, FileError> {
    match catch_unwind(AssertUnwindSafe(|| process_file(path, classifier))) {
        Ok(result) => result,
        Err(_) => Err(FileError::Panic {
            path: path.to_path_buf(),
        }),
    }
}
