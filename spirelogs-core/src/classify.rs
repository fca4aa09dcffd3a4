//! Validity classifier for run records.
//!
//! A record is trustworthy only when every predicate in a fixed, ordered rule
//! table passes. Evaluation short-circuits: the verdict carries the reason of
//! the first failing rule even when several would fail independently, so
//! rejection histograms stay stable across reprocessing runs. The classifier
//! is pure: no I/O, no interior state, identical input always yields the
//! identical verdict.

use serde_json::Value;
use thiserror::Error;

use crate::record::{EventChoice, FieldTypeError, RunRecord};
use crate::tables::ReferenceTables;

/// Stable reason codes explaining why a record was rejected. Diagnostics key
/// histograms by [`Reason::code`], so variants must never change their codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The payload was not a keyed structure at all.
    InvalidInputType,
    /// `daily_mods` or `neow_cos3` present: daily-mode run.
    DailyModeMarker,
    /// The player chose their own seed.
    ChoseSeed,
    /// `circlet_count` above zero.
    NonzeroCircletCount,
    /// Beta-branch client.
    BetaClient,
    /// A special seed was active.
    SpecialSeed,
    /// Unreleased or test-only character.
    ModdedCharacter,
    /// Neow cost value only a modified client produces.
    ModdedNeowCost,
    /// Neow bonus outside the valid bonus table.
    ModdedNeowBonus,
    /// Unknown or malformed event entry.
    ModdedEvent,
    /// Recognized event with a blocklisted player choice.
    ModdedEventChoice { event: String, choice: String },
    /// Card outside the valid card table.
    ModdedCard,
    /// Enemy identifier from a mod (or a malformed battle entry).
    ModdedEnemy,
    /// `floor_reached` unparseable or outside `[0, 999]`.
    InvalidFloor,
    /// The classifier itself failed; assigned by the file worker.
    FilterCheckError,
}

impl Reason {
    /// Stable identifier consumed by diagnostics.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::InvalidInputType => "invalid_input_type".to_string(),
            Self::DailyModeMarker => "daily_mods_or_neow_cos3_present".to_string(),
            Self::ChoseSeed => "chose_seed_true".to_string(),
            Self::NonzeroCircletCount => "nonzero_circlet_count".to_string(),
            Self::BetaClient => "is_beta_true".to_string(),
            Self::SpecialSeed => "special_seed_used".to_string(),
            Self::ModdedCharacter => "modded_character".to_string(),
            Self::ModdedNeowCost => "modded_neow_cost".to_string(),
            Self::ModdedNeowBonus => "modded_neow_bonus".to_string(),
            Self::ModdedEvent => "modded_event_found".to_string(),
            Self::ModdedEventChoice { event, choice } => {
                format!("modded_event_choice:{event}:{choice}")
            }
            Self::ModdedCard => "modded_card_found".to_string(),
            Self::ModdedEnemy => "modded_enemy_found".to_string(),
            Self::InvalidFloor => "invalid_floor_value".to_string(),
            Self::FilterCheckError => "filter_check_error".to_string(),
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code())
    }
}

/// Outcome of classifying one run record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(Reason),
}

impl Verdict {
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Errors raised when a predicate cannot be evaluated at all (as opposed to
/// evaluating to a rejection). The file worker maps these to the
/// `filter_check_error` reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("predicate could not be evaluated: {0}")]
    BadFieldType(#[from] FieldTypeError),
}

/// How to treat flag fields that are absent from the record.
///
/// The upstream source disagreed with itself here: one entry point defaulted
/// missing `chose_seed`/`circlet_count`/`is_beta`/`special_seed`/`neow_cost`
/// to safe values, the other to values that already reject. Both behaviors
/// are preserved behind this switch; [`MissingKeyPolicy::Lenient`] is the
/// default and what the aggregation pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// A missing flag passes its predicate.
    #[default]
    Lenient,
    /// A missing flag counts as already invalid.
    Strict,
}

/// One entry in the ordered rule table.
struct Rule {
    name: &'static str,
    check: fn(&Classifier, &RunRecord) -> Result<Option<Reason>, ClassifyError>,
}

/// Rule order is part of the contract: the first failing rule names the
/// rejection reason.
const RULES: &[Rule] = &[
    Rule {
        name: "daily_mode_marker",
        check: Classifier::check_daily_marker,
    },
    Rule {
        name: "chose_seed",
        check: Classifier::check_chose_seed,
    },
    Rule {
        name: "circlet_count",
        check: Classifier::check_circlet_count,
    },
    Rule {
        name: "beta_flag",
        check: Classifier::check_is_beta,
    },
    Rule {
        name: "special_seed",
        check: Classifier::check_special_seed,
    },
    Rule {
        name: "character",
        check: Classifier::check_character,
    },
    Rule {
        name: "neow_cost",
        check: Classifier::check_neow_cost,
    },
    Rule {
        name: "neow_bonus",
        check: Classifier::check_neow_bonus,
    },
    Rule {
        name: "event_validity",
        check: Classifier::check_events,
    },
    Rule {
        name: "card_validity",
        check: Classifier::check_cards,
    },
    Rule {
        name: "enemy_validity",
        check: Classifier::check_enemies,
    },
    Rule {
        name: "floor_range",
        check: Classifier::check_floor,
    },
];

/// Highest floor a legitimate run can report.
const MAX_FLOOR: i64 = 999;

/// Separator that namespaced mod frameworks insert into enemy identifiers.
const MOD_NAMESPACE_SEPARATOR: char = ':';

/// Pure record-by-record validity classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    tables: ReferenceTables,
    policy: MissingKeyPolicy,
}

impl Classifier {
    /// Create a classifier over the given reference tables with the default
    /// (lenient) missing-key policy.
    #[must_use]
    pub fn new(tables: ReferenceTables) -> Self {
        Self {
            tables,
            policy: MissingKeyPolicy::default(),
        }
    }

    /// Override the missing-key policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: MissingKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    /// Names of the rules in evaluation order, for diagnostics.
    #[must_use]
    pub fn rule_names() -> Vec<&'static str> {
        RULES.iter().map(|rule| rule.name).collect()
    }

    /// Classify one record. Non-object input rejects with
    /// `invalid_input_type`; otherwise the first failing rule (in table
    /// order) names the reason.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] when a predicate cannot be evaluated, e.g.
    /// a `circlet_count` that is not a number. The file worker converts this
    /// into the `filter_check_error` reason.
    pub fn classify(&self, value: &Value) -> Result<Verdict, ClassifyError> {
        let Some(record) = RunRecord::from_value(value) else {
            return Ok(Verdict::Reject(Reason::InvalidInputType));
        };
        for rule in RULES {
            if let Some(reason) = (rule.check)(self, &record)? {
                return Ok(Verdict::Reject(reason));
            }
        }
        Ok(Verdict::Accept)
    }

    fn check_daily_marker(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        if record.has_key("daily_mods") || record.has_key("neow_cos3") {
            Ok(Some(Reason::DailyModeMarker))
        } else {
            Ok(None)
        }
    }

    fn check_chose_seed(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let chosen = record
            .flag("chose_seed")
            .unwrap_or(self.policy == MissingKeyPolicy::Strict);
        Ok(chosen.then_some(Reason::ChoseSeed))
    }

    fn check_circlet_count(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let count = match record.integer("circlet_count")? {
            Some(count) => count,
            None if self.policy == MissingKeyPolicy::Strict => 1,
            None => 0,
        };
        Ok((count > 0).then_some(Reason::NonzeroCircletCount))
    }

    fn check_is_beta(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let beta = record
            .flag("is_beta")
            .unwrap_or(self.policy == MissingKeyPolicy::Strict);
        Ok(beta.then_some(Reason::BetaClient))
    }

    fn check_special_seed(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let seed = match record.integer("special_seed")? {
            Some(seed) => seed,
            None if self.policy == MissingKeyPolicy::Strict => 1,
            None => 0,
        };
        Ok((seed > 0).then_some(Reason::SpecialSeed))
    }

    fn check_character(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        if let Some(character) = record.string("character_chosen")
            && self.tables.disallowed_characters.contains(character)
        {
            return Ok(Some(Reason::ModdedCharacter));
        }
        Ok(None)
    }

    fn check_neow_cost(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let cost = if record.has_key("neow_cost") {
            record.string("neow_cost")
        } else {
            // A client that never recorded the cost reads as the empty cost
            // under the strict policy, which is itself in the invalid set.
            match self.policy {
                MissingKeyPolicy::Strict => Some(""),
                MissingKeyPolicy::Lenient => None,
            }
        };
        if let Some(cost) = cost
            && self.tables.invalid_neow_costs.contains(cost)
        {
            return Ok(Some(Reason::ModdedNeowCost));
        }
        Ok(None)
    }

    fn check_neow_bonus(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        // An empty or absent bonus is valid; anything truthy must appear in
        // the valid bonus table. Truthy non-strings can never appear there.
        let Some(value) = record.get("neow_bonus") else {
            return Ok(None);
        };
        if !crate::record::is_truthy(value) {
            return Ok(None);
        }
        let known = value
            .as_str()
            .is_some_and(|bonus| self.tables.valid_neow_bonuses.contains(bonus));
        Ok((!known).then_some(Reason::ModdedNeowBonus))
    }

    fn check_events(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let Some(value) = record.get("event_choices") else {
            return Ok(None);
        };
        let Some(entries) = value.as_array() else {
            return Ok(Some(Reason::ModdedEvent));
        };
        for entry in entries {
            let Some(choice_entry) = EventChoice::from_value(entry) else {
                return Ok(Some(Reason::ModdedEvent));
            };
            if !choice_entry.has_event_name() {
                return Ok(Some(Reason::ModdedEvent));
            }
            let Some(name) = choice_entry.event_name() else {
                return Ok(Some(Reason::ModdedEvent));
            };
            if !self.tables.valid_events.contains(name) {
                return Ok(Some(Reason::ModdedEvent));
            }
            // Some event/choice combinations are only producible by mods even
            // though the event itself is legitimate. Every entry is checked,
            // not just the first.
            if let Some(blocked) = self.tables.blocked_choices(name)
                && let Some(choice) = choice_entry.player_choice()
                && blocked.contains(choice)
            {
                return Ok(Some(Reason::ModdedEventChoice {
                    event: name.to_string(),
                    choice: choice.to_string(),
                }));
            }
        }
        Ok(None)
    }

    fn check_cards(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let Some(value) = record.get("master_deck") else {
            return Ok(None);
        };
        let Some(cards) = value.as_array() else {
            return Ok(Some(Reason::ModdedCard));
        };
        for card in cards {
            let known = card
                .as_str()
                .is_some_and(|card| self.tables.valid_cards.contains(card));
            if !known {
                return Ok(Some(Reason::ModdedCard));
            }
        }
        Ok(None)
    }

    fn check_enemies(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        // A non-list damage_taken is left for other rules to judge; this rule
        // only inspects well-formed battle lists.
        let Some(battles) = record.array("damage_taken") else {
            return Ok(None);
        };
        for battle in battles {
            let Some(battle) = battle.as_object() else {
                return Ok(Some(Reason::ModdedEnemy));
            };
            if let Some(enemy) = battle.get("enemies").and_then(Value::as_str) {
                if enemy.contains(MOD_NAMESPACE_SEPARATOR)
                    || self.tables.modded_enemies.contains(enemy)
                {
                    return Ok(Some(Reason::ModdedEnemy));
                }
            }
        }
        Ok(None)
    }

    fn check_floor(&self, record: &RunRecord) -> Result<Option<Reason>, ClassifyError> {
        let Some(value) = record.get("floor_reached") else {
            return Ok(None);
        };
        let floor = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Array(_) | Value::Object(_) => None,
        };
        match floor {
            Some(floor) if (0..=MAX_FLOOR).contains(&floor) => Ok(None),
            _ => Ok(Some(Reason::InvalidFloor)),
        }
    }
}
