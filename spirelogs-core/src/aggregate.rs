//! Reduction of per-file partial results into the global snapshot.

use serde::Serialize;

use crate::tally::RunTally;
use crate::worker::FileError;

/// The fully merged distribution set plus file-level accounting. This is the
/// value handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GlobalTally {
    /// Merged distributions and record-level counters.
    pub tally: RunTally,
    /// Files that produced a usable partial result.
    pub files_ok: u64,
    /// Files excluded entirely (read or parse failure, worker panic).
    pub files_failed: u64,
}

impl GlobalTally {
    /// Fold one per-file result into the global set. File errors increment
    /// only the failed-files counter and contribute nothing numeric.
    pub fn absorb(&mut self, result: &Result<RunTally, FileError>) {
        match result {
            Ok(partial) => {
                self.files_ok += 1;
                self.tally.merge(partial);
            }
            Err(_) => self.files_failed += 1,
        }
    }

    /// Merge another global set into this one. Used when reductions are
    /// themselves performed in pieces; the result is identical to reducing
    /// the union of their inputs.
    pub fn merge(&mut self, other: &Self) {
        self.tally.merge(&other.tally);
        self.files_ok += other.files_ok;
        self.files_failed += other.files_failed;
    }
}

/// Reduce any number of per-file results into one global distribution set.
/// Order- and grouping-independent because every merge primitive is
/// associative and commutative.
pub fn reduce<'a, I>(results: I) -> GlobalTally
where
    I: IntoIterator<Item = &'a Result<RunTally, FileError>>,
{
    let mut global = GlobalTally::default();
    for result in results {
        global.absorb(result);
    }
    global
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tally_with(card: &str, processed: u64) -> RunTally {
        let mut tally = RunTally::default();
        tally.master_deck.bump(card);
        tally.processed = processed;
        tally.floors_visited.insert("M".to_string());
        tally
    }

    fn file_error() -> Result<RunTally, FileError> {
        Err(FileError::Panic {
            path: PathBuf::from("broken.json"),
        })
    }

    #[test]
    fn file_errors_count_only_toward_failed_files() {
        let results = vec![Ok(tally_with("Bash", 2)), file_error(), file_error()];
        let global = reduce(&results);
        assert_eq!(global.files_ok, 1);
        assert_eq!(global.files_failed, 2);
        assert_eq!(global.tally.processed, 2);
        assert_eq!(global.tally.master_deck.get("Bash"), 1);
    }

    #[test]
    fn reduction_is_partition_independent() {
        let a = Ok(tally_with("Bash", 1));
        let b = Ok(tally_with("Anger", 3));
        let c: Result<RunTally, FileError> = Ok(tally_with("Bash", 5));

        let all = reduce([&a, &b, &c]);

        let mut split = reduce([&a, &b]);
        split.merge(&reduce([&c]));
        assert_eq!(all, split);

        let reordered = reduce([&c, &a, &b]);
        assert_eq!(all, reordered);
        assert_eq!(all.tally.master_deck.get("Bash"), 2);
        assert_eq!(all.tally.processed, 9);
    }

    #[test]
    fn empty_reduction_is_the_identity() {
        let global = reduce(std::iter::empty::<&Result<RunTally, FileError>>());
        assert_eq!(global, GlobalTally::default());
        let single = vec![Ok(tally_with("Bash", 1))];
        let mut merged = reduce(&single);
        merged.merge(&global);
        assert_eq!(merged, reduce(&single));
    }
}
