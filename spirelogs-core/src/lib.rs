//! Spirelogs Core
//!
//! Platform-agnostic filtering and aggregation logic for Spire run-log
//! telemetry. This crate decides, record by record, whether a run is
//! trustworthy (the validity classifier) and reduces accepted records into
//! global frequency distributions (the tally algebra), without any I/O
//! scheduling or persistence concerns - those live in the CLI crate.

pub mod aggregate;
pub mod classify;
pub mod extract;
pub mod record;
pub mod tables;
pub mod tally;
pub mod worker;

// Re-export commonly used types
pub use aggregate::{GlobalTally, reduce};
pub use classify::{Classifier, ClassifyError, MissingKeyPolicy, Reason, Verdict};
pub use extract::extract_into;
pub use record::{EventChoice, FieldTypeError, RunRecord, is_truthy};
pub use tables::{ReferenceTables, TablesError};
pub use tally::{DistinctSet, FreqTable, NestedTable, RunTally, scalar_key};
pub use worker::{FileError, process_file, process_value};
