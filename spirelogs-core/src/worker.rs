//! Per-file worker: read, parse, classify, extract.
//!
//! One worker invocation owns one file and produces one self-contained
//! [`RunTally`]. Element-level and field-level problems become counters and
//! never abort the file; only an unreadable or unparseable file is reported
//! as a [`FileError`], and even that only costs the run that file's
//! contribution.

use log::warn;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classify::{Classifier, Reason, Verdict};
use crate::extract::extract_into;
use crate::record::RunRecord;
use crate::tally::RunTally;

/// A whole file was unusable. The scheduler counts these; they never abort
/// the run.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// A worker task panicked; converted at the pool boundary.
    #[error("worker panicked on {path}")]
    Panic { path: PathBuf },
}

impl FileError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Panic { path } => path,
        }
    }
}

/// Process one telemetry file into a partial distribution set.
///
/// Empty content yields an empty but valid tally. The top level must be a
/// single `{"event": ...}` wrapper or an array of such wrappers; any other
/// top-level shape counts one element error and still returns a (zero-valued)
/// tally.
///
/// # Errors
///
/// Returns [`FileError`] when the file cannot be read or its content is not
/// valid JSON.
pub fn process_file(path: &Path, classifier: &Classifier) -> Result<RunTally, FileError> {
    let content = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.is_empty() {
        return Ok(RunTally::default());
    }
    let parsed: Value = serde_json::from_str(&content).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(process_value(&parsed, classifier, path))
}

/// Classify and extract every record in an already-parsed file payload.
/// Split from [`process_file`] so the parse path is testable without disk.
#[must_use]
pub fn process_value(parsed: &Value, classifier: &Classifier, origin: &Path) -> RunTally {
    let mut tally = RunTally::default();

    let elements: &[Value] = match parsed {
        Value::Array(items) => items,
        Value::Object(map) if map.contains_key("event") => std::slice::from_ref(parsed),
        other => {
            warn!(
                "expected a log list or wrapper object, got {} in {}",
                json_kind(other),
                origin.display()
            );
            tally.element_errors += 1;
            return tally;
        }
    };

    for element in elements {
        let Some(wrapper) = RunRecord::from_value(element) else {
            tally.element_errors += 1;
            continue;
        };
        let Some(payload) = wrapper.get("event") else {
            tally.element_errors += 1;
            continue;
        };
        let Some(record) = RunRecord::from_value(payload) else {
            tally.element_errors += 1;
            continue;
        };

        let verdict = match classifier.classify(payload) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("classifier failed in {}: {e}", origin.display());
                tally.filter_errors += 1;
                Verdict::Reject(Reason::FilterCheckError)
            }
        };

        match verdict {
            Verdict::Reject(reason) => {
                tally.rejected += 1;
                tally.reject_reasons.bump(reason.code());
            }
            Verdict::Accept => {
                tally.processed += 1;
                extract_into(&record, &mut tally);
            }
        }
    }

    tally
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
