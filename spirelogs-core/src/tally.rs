//! Counting structures and their merge algebra.
//!
//! Every aggregation primitive here (key-wise sum, set union, two-level sum)
//! is associative and commutative, so merging partial results is independent
//! of file processing order and worker count. Containers are ordered maps so
//! serialized snapshots are deterministic.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Canonical string key for a JSON scalar, or `None` for non-scalars.
/// Booleans, integers, and strings all occur as keys in real telemetry
/// (`victory: true`, `floor_reached: "12"`), so they share one key space.
#[must_use]
pub fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Flat frequency table: observed value -> occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(transparent)]
pub struct FreqTable(BTreeMap<String, u64>);

impl FreqTable {
    /// Increment the count for `key` by one.
    pub fn bump(&mut self, key: impl Into<String>) {
        self.add(key, 1);
    }

    /// Increment the count for `key` by `n`.
    pub fn add(&mut self, key: impl Into<String>, n: u64) {
        *self.0.entry(key.into()).or_insert(0) += n;
    }

    /// Key-wise sum. Associative and commutative.
    pub fn merge(&mut self, other: &Self) {
        for (key, count) in &other.0 {
            self.add(key.clone(), *count);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total of all counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Entries sorted by count descending, ties broken by key, for reports.
    #[must_use]
    pub fn sorted_by_count(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> =
            self.0.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }
}

/// Two-level frequency table: outer key -> inner value -> count.
/// One type serves enemy->damage, potion->floor, and event->choice counts so
/// the merge is written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(transparent)]
pub struct NestedTable(BTreeMap<String, FreqTable>);

impl NestedTable {
    pub fn bump(&mut self, outer: impl Into<String>, inner: impl Into<String>) {
        self.0.entry(outer.into()).or_default().bump(inner);
    }

    /// Outer key union, inner tables summed. Associative and commutative.
    pub fn merge(&mut self, other: &Self) {
        for (outer, counts) in &other.0 {
            self.0.entry(outer.clone()).or_default().merge(counts);
        }
    }

    #[must_use]
    pub fn get(&self, outer: &str) -> Option<&FreqTable> {
        self.0.get(outer)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn outer_len(&self) -> usize {
        self.0.len()
    }
}

/// Set of distinct observed values, unioned on merge.
pub type DistinctSet = BTreeSet<String>;

/// Per-file accumulation of every distribution the pipeline tracks, plus
/// diagnostic counters. Created fresh per file, merged into the global
/// snapshot, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct RunTally {
    // Flat frequency tables for single-valued fields.
    pub floor_reached: FreqTable,
    pub master_deck: FreqTable,
    pub relics: FreqTable,
    pub path_per_floor: FreqTable,
    pub neow_bonus: FreqTable,
    pub neow_cost: FreqTable,
    pub purchased_purges: FreqTable,
    pub events: FreqTable,
    pub is_trial: FreqTable,
    pub character_chosen: FreqTable,
    pub is_prod: FreqTable,
    pub is_daily: FreqTable,
    pub chose_seed: FreqTable,
    pub circlet_count: FreqTable,
    pub win_rate: FreqTable,
    pub is_beta: FreqTable,
    pub is_endless: FreqTable,
    pub special_seed: FreqTable,

    // Two-level tables.
    pub damage_taken_by_enemy: NestedTable,
    pub potions_obtained: NestedTable,
    pub event_player_choices: NestedTable,

    // Distinct-value sets.
    pub floors_visited: DistinctSet,
    pub items_purchased: DistinctSet,
    pub build_versions: DistinctSet,

    // Diagnostic counters.
    /// Records accepted and extracted.
    pub processed: u64,
    /// Records rejected by the classifier.
    pub rejected: u64,
    /// Rejection reason histogram, keyed by stable reason code.
    pub reject_reasons: FreqTable,
    /// Elements whose wrapper shape was unusable.
    pub element_errors: u64,
    /// Records where the classifier itself failed.
    pub filter_errors: u64,
    /// Fields skipped because their shape was unexpected.
    pub extraction_errors: u64,
}

impl RunTally {
    /// Merge another tally into this one, field by field. Every primitive is
    /// associative and commutative, so grouping and ordering do not matter.
    pub fn merge(&mut self, other: &Self) {
        self.floor_reached.merge(&other.floor_reached);
        self.master_deck.merge(&other.master_deck);
        self.relics.merge(&other.relics);
        self.path_per_floor.merge(&other.path_per_floor);
        self.neow_bonus.merge(&other.neow_bonus);
        self.neow_cost.merge(&other.neow_cost);
        self.purchased_purges.merge(&other.purchased_purges);
        self.events.merge(&other.events);
        self.is_trial.merge(&other.is_trial);
        self.character_chosen.merge(&other.character_chosen);
        self.is_prod.merge(&other.is_prod);
        self.is_daily.merge(&other.is_daily);
        self.chose_seed.merge(&other.chose_seed);
        self.circlet_count.merge(&other.circlet_count);
        self.win_rate.merge(&other.win_rate);
        self.is_beta.merge(&other.is_beta);
        self.is_endless.merge(&other.is_endless);
        self.special_seed.merge(&other.special_seed);

        self.damage_taken_by_enemy.merge(&other.damage_taken_by_enemy);
        self.potions_obtained.merge(&other.potions_obtained);
        self.event_player_choices.merge(&other.event_player_choices);

        self.floors_visited
            .extend(other.floors_visited.iter().cloned());
        self.items_purchased
            .extend(other.items_purchased.iter().cloned());
        self.build_versions
            .extend(other.build_versions.iter().cloned());

        self.processed += other.processed;
        self.rejected += other.rejected;
        self.reject_reasons.merge(&other.reject_reasons);
        self.element_errors += other.element_errors;
        self.filter_errors += other.filter_errors;
        self.extraction_errors += other.extraction_errors;
    }
}
