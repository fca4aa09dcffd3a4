//! Final summary output and snapshot persistence.

use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use spirelogs_core::GlobalTally;

/// Log the run totals and the rejection-reason breakdown, most frequent
/// reason first.
pub fn log_summary(global: &GlobalTally) {
    let tally = &global.tally;
    info!("total accepted records: {}", tally.processed);
    info!("total rejected records: {}", tally.rejected);
    if tally.element_errors > 0 {
        warn!("element errors within log files: {}", tally.element_errors);
    }
    if tally.filter_errors > 0 {
        warn!("classifier check failures: {}", tally.filter_errors);
    }
    if tally.extraction_errors > 0 {
        warn!("fields skipped during extraction: {}", tally.extraction_errors);
    }
    if global.files_failed > 0 {
        warn!(
            "files excluded entirely (read/parse failures): {}",
            global.files_failed
        );
    }

    if tally.reject_reasons.is_empty() {
        info!("no records were rejected");
    } else {
        info!("rejection reason breakdown:");
        for (reason, count) in tally.reject_reasons.sorted_by_count() {
            info!("  - {reason}: {count}");
        }
    }
}

/// Persist the global snapshot as pretty-printed JSON. The byte format is an
/// external concern; downstream analysis only needs the in-memory shape.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_snapshot(path: &Path, global: &GlobalTally) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating snapshot file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, global).context("serializing snapshot")?;
    writer.flush().context("flushing snapshot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spirelogs_core::RunTally;

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut tally = RunTally::default();
        tally.master_deck.bump("Bash");
        tally.processed = 1;
        tally.reject_reasons.bump("is_beta_true");
        let global = GlobalTally {
            tally,
            files_ok: 1,
            files_failed: 2,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        write_snapshot(&path, &global).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["files_failed"], 2);
        assert_eq!(parsed["tally"]["master_deck"]["Bash"], 1);
        assert_eq!(parsed["tally"]["reject_reasons"]["is_beta_true"], 1);
    }
}
