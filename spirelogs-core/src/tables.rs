//! Reference tables consulted by the validity classifier.
//!
//! Every table is plain data loaded once and passed explicitly into the
//! classifier, so tests can substitute their own sets and nothing hides in
//! module-level globals. The event-choice blocklist maps an event name to the
//! player-choice strings that only external modifications can produce even
//! though the event itself is legitimate.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default reference data shipped with the crate. Operators normally supply
/// their own, more complete tables at startup.
const DEFAULT_TABLES_JSON: &str = include_str!("../assets/default_tables.json");

static BUILTIN: Lazy<ReferenceTables> = Lazy::new(|| {
    ReferenceTables::from_json(DEFAULT_TABLES_JSON)
        .unwrap_or_else(|e| panic!("embedded default tables are invalid: {e}"))
});

/// Errors raised while loading reference tables.
#[derive(Debug, Error)]
pub enum TablesError {
    #[error("failed to read tables file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse tables JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable lookup sets and mappings used by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReferenceTables {
    /// Event names the base game can emit.
    #[serde(default)]
    pub valid_events: BTreeSet<String>,
    /// Card identifiers (including upgraded variants) the base game can emit.
    #[serde(default)]
    pub valid_cards: BTreeSet<String>,
    /// Enemy identifiers known to come from mods.
    #[serde(default)]
    pub modded_enemies: BTreeSet<String>,
    /// Neow bonus identifiers the base game can emit.
    #[serde(default)]
    pub valid_neow_bonuses: BTreeSet<String>,
    /// Neow cost values that indicate a non-standard client.
    #[serde(default = "default_invalid_neow_costs")]
    pub invalid_neow_costs: BTreeSet<String>,
    /// Characters excluded from analysis (unreleased or test-only).
    #[serde(default = "default_disallowed_characters")]
    pub disallowed_characters: BTreeSet<String>,
    /// Event name -> player-choice strings that must always be rejected.
    #[serde(default)]
    pub event_choice_blocklist: BTreeMap<String, BTreeSet<String>>,
}

fn default_invalid_neow_costs() -> BTreeSet<String> {
    ["", "FIFTY_PERCENT_DAMAGE", "BASIC_CARDS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_disallowed_characters() -> BTreeSet<String> {
    ["SCHOLAR"].into_iter().map(String::from).collect()
}

impl ReferenceTables {
    /// The embedded default table set.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Parse tables from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into valid tables.
    pub fn from_json(json: &str) -> Result<Self, TablesError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load tables from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, TablesError> {
        let content = fs::read_to_string(path).map_err(|source| TablesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Disallowed player choices for an event, if the event is blocklisted.
    #[must_use]
    pub fn blocked_choices(&self, event_name: &str) -> Option<&BTreeSet<String>> {
        self.event_choice_blocklist.get(event_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_parse_and_carry_required_blocklist() {
        let tables = ReferenceTables::builtin();
        assert!(tables.valid_events.contains("Golden Shrine"));
        assert!(tables.valid_cards.contains("Bash"));
        assert!(tables.invalid_neow_costs.contains(""));
        assert!(tables.disallowed_characters.contains("SCHOLAR"));

        let shrine = tables.blocked_choices("Golden Shrine").unwrap();
        assert!(shrine.contains("Skipped"));
        let mausoleum = tables.blocked_choices("The Mausoleum").unwrap();
        assert!(mausoleum.contains("Yes") && mausoleum.contains("No"));
        let bonfire = tables.blocked_choices("Bonfire Elementals").unwrap();
        for rarity in ["UNCOMMON", "BASIC", "RARE", "CURSE", "COMMON", "SPECIAL"] {
            assert!(bonfire.contains(rarity));
        }
        assert!(tables.blocked_choices("Big Fish").is_none());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let tables = ReferenceTables::from_json("{}").unwrap();
        assert!(tables.valid_events.is_empty());
        assert!(tables.invalid_neow_costs.contains("BASIC_CARDS"));
        assert!(tables.disallowed_characters.contains("SCHOLAR"));
    }
}
