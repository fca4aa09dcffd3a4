//! Field extraction for accepted records.
//!
//! Roughly twenty independent fields feed the distribution set. Extraction is
//! fault-isolated per field: a field that is present with an unusable shape
//! bumps `extraction_errors` and is skipped, and never blocks any other field
//! of the same record. Elements inside list fields that do not conform are
//! skipped silently (only well-formed elements count).

use serde_json::Value;

use crate::record::{EventChoice, RunRecord};
use crate::tally::{FreqTable, RunTally, scalar_key};

/// Flat scalar fields counted by canonical key when present.
const SCALAR_FIELDS: &[(&str, fn(&mut RunTally) -> &mut FreqTable)] = &[
    ("floor_reached", |t| &mut t.floor_reached),
    ("neow_bonus", |t| &mut t.neow_bonus),
    ("neow_cost", |t| &mut t.neow_cost),
    ("purchased_purges", |t| &mut t.purchased_purges),
    ("is_trial", |t| &mut t.is_trial),
    ("is_prod", |t| &mut t.is_prod),
    ("is_daily", |t| &mut t.is_daily),
    ("chose_seed", |t| &mut t.chose_seed),
    ("circlet_count", |t| &mut t.circlet_count),
    ("is_beta", |t| &mut t.is_beta),
    ("is_endless", |t| &mut t.is_endless),
    ("special_seed", |t| &mut t.special_seed),
];

/// Accumulate every tracked field of an accepted record into the tally.
pub fn extract_into(record: &RunRecord, tally: &mut RunTally) {
    for (key, table) in SCALAR_FIELDS {
        if let Some(value) = record.get(key) {
            match scalar_key(value) {
                Some(scalar) => table(tally).bump(scalar),
                None => tally.extraction_errors += 1,
            }
        }
    }

    // victory feeds the win-rate distribution under its analysis name.
    if let Some(value) = record.get("victory") {
        match scalar_key(value) {
            Some(scalar) => tally.win_rate.bump(scalar),
            None => tally.extraction_errors += 1,
        }
    }

    // character_chosen is only meaningful as a string identifier.
    if let Some(value) = record.get("character_chosen") {
        match value.as_str() {
            Some(character) => tally.character_chosen.bump(character),
            None => tally.extraction_errors += 1,
        }
    }

    extract_string_list(record, tally, "master_deck", |t| &mut t.master_deck);
    extract_string_list(record, tally, "relics", |t| &mut t.relics);
    extract_damage_taken(record, tally);
    extract_potions(record, tally);
    extract_path_per_floor(record, tally);
    extract_distinct(record, tally, "items_purchased");
    extract_build_version(record, tally);
    extract_event_choices(record, tally);
}

fn extract_string_list(
    record: &RunRecord,
    tally: &mut RunTally,
    key: &str,
    table: fn(&mut RunTally) -> &mut FreqTable,
) {
    let Some(value) = record.get(key) else { return };
    let Some(items) = value.as_array() else {
        tally.extraction_errors += 1;
        return;
    };
    for item in items {
        if let Some(item) = item.as_str() {
            table(tally).bump(item);
        }
    }
}

fn extract_damage_taken(record: &RunRecord, tally: &mut RunTally) {
    let Some(value) = record.get("damage_taken") else {
        return;
    };
    let Some(battles) = value.as_array() else {
        tally.extraction_errors += 1;
        return;
    };
    for battle in battles {
        let Some(battle) = battle.as_object() else {
            continue;
        };
        let enemy = battle.get("enemies").and_then(Value::as_str);
        let damage = battle.get("damage").and_then(scalar_key);
        if let (Some(enemy), Some(damage)) = (enemy, damage) {
            tally.damage_taken_by_enemy.bump(enemy, damage);
        }
    }
}

fn extract_potions(record: &RunRecord, tally: &mut RunTally) {
    let Some(value) = record.get("potions_obtained") else {
        return;
    };
    let Some(potions) = value.as_array() else {
        tally.extraction_errors += 1;
        return;
    };
    for potion in potions {
        let Some(potion) = potion.as_object() else {
            continue;
        };
        let key = potion.get("key").and_then(Value::as_str);
        let floor = potion.get("floor").and_then(scalar_key);
        if let (Some(key), Some(floor)) = (key, floor) {
            tally.potions_obtained.bump(key, floor);
        }
    }
}

fn extract_path_per_floor(record: &RunRecord, tally: &mut RunTally) {
    let Some(value) = record.get("path_per_floor") else {
        return;
    };
    let Some(path) = value.as_array() else {
        tally.extraction_errors += 1;
        return;
    };
    for room in path {
        if let Some(scalar) = scalar_key(room) {
            tally.floors_visited.insert(scalar);
        }
        // Room-type frequencies only make sense for the string tokens.
        if let Some(token) = room.as_str() {
            tally.path_per_floor.bump(token);
        }
    }
}

fn extract_distinct(record: &RunRecord, tally: &mut RunTally, key: &str) {
    let Some(value) = record.get(key) else { return };
    let Some(items) = value.as_array() else {
        tally.extraction_errors += 1;
        return;
    };
    for item in items {
        if let Some(scalar) = scalar_key(item) {
            tally.items_purchased.insert(scalar);
        }
    }
}

fn extract_build_version(record: &RunRecord, tally: &mut RunTally) {
    let Some(value) = record.get("build_version") else {
        return;
    };
    match scalar_key(value) {
        Some(scalar) => {
            tally.build_versions.insert(scalar);
        }
        None => tally.extraction_errors += 1,
    }
}

fn extract_event_choices(record: &RunRecord, tally: &mut RunTally) {
    let Some(value) = record.get("event_choices") else {
        return;
    };
    let Some(entries) = value.as_array() else {
        tally.extraction_errors += 1;
        return;
    };
    for entry in entries {
        let Some(choice_entry) = EventChoice::from_value(entry) else {
            continue;
        };
        let Some(name) = choice_entry.event_name() else {
            continue;
        };
        tally.events.bump(name);
        if let Some(choice) = choice_entry.player_choice() {
            tally.event_player_choices.bump(name, choice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RunRecord;
    use serde_json::json;

    fn extract(value: &serde_json::Value) -> RunTally {
        let record = RunRecord::from_value(value).unwrap();
        let mut tally = RunTally::default();
        extract_into(&record, &mut tally);
        tally
    }

    #[test]
    fn scalar_fields_count_by_canonical_key() {
        let tally = extract(&json!({
            "floor_reached": 34,
            "victory": true,
            "neow_bonus": "THREE_CARDS",
            "circlet_count": 0,
            "character_chosen": "WATCHER"
        }));
        assert_eq!(tally.floor_reached.get("34"), 1);
        assert_eq!(tally.win_rate.get("true"), 1);
        assert_eq!(tally.neow_bonus.get("THREE_CARDS"), 1);
        assert_eq!(tally.circlet_count.get("0"), 1);
        assert_eq!(tally.character_chosen.get("WATCHER"), 1);
        assert_eq!(tally.extraction_errors, 0);
    }

    #[test]
    fn deck_and_relics_count_string_elements_only() {
        let tally = extract(&json!({
            "master_deck": ["Bash", "Bash", 9, null, "Anger"],
            "relics": ["Burning Blood", {"relic": "Anchor"}]
        }));
        assert_eq!(tally.master_deck.get("Bash"), 2);
        assert_eq!(tally.master_deck.get("Anger"), 1);
        assert_eq!(tally.master_deck.total(), 3);
        assert_eq!(tally.relics.get("Burning Blood"), 1);
        assert_eq!(tally.relics.total(), 1);
    }

    #[test]
    fn nested_tables_take_well_formed_pairs_only() {
        let tally = extract(&json!({
            "damage_taken": [
                {"enemies": "Cultist", "damage": 6},
                {"enemies": "Cultist", "damage": 6},
                {"enemies": "Jaw Worm"},
                {"damage": 12},
                "garbage"
            ],
            "potions_obtained": [
                {"key": "Fire Potion", "floor": 3},
                {"key": "Fire Potion"},
                {"floor": 9}
            ]
        }));
        assert_eq!(tally.damage_taken_by_enemy.get("Cultist").unwrap().get("6"), 2);
        assert!(tally.damage_taken_by_enemy.get("Jaw Worm").is_none());
        assert_eq!(tally.potions_obtained.get("Fire Potion").unwrap().get("3"), 1);
        assert_eq!(tally.potions_obtained.outer_len(), 1);
    }

    #[test]
    fn path_feeds_both_the_set_and_the_frequency_table() {
        let tally = extract(&json!({
            "path_per_floor": ["M", "M", "?", "E", 4, null, "R"]
        }));
        assert_eq!(tally.path_per_floor.get("M"), 2);
        assert_eq!(tally.path_per_floor.get("?"), 1);
        assert_eq!(tally.path_per_floor.total(), 5);
        assert!(tally.floors_visited.contains("M"));
        assert!(tally.floors_visited.contains("4"));
        assert!(!tally.floors_visited.contains("null"));
    }

    #[test]
    fn wrong_shaped_field_is_isolated_from_the_rest() {
        let tally = extract(&json!({
            "master_deck": "not a list",
            "relics": ["Anchor"],
            "floor_reached": [12],
            "victory": true
        }));
        assert_eq!(tally.extraction_errors, 2);
        assert_eq!(tally.relics.get("Anchor"), 1);
        assert_eq!(tally.win_rate.get("true"), 1);
        assert!(tally.master_deck.is_empty());
        assert!(tally.floor_reached.is_empty());
    }

    #[test]
    fn event_choices_feed_flat_and_nested_tables() {
        let tally = extract(&json!({
            "event_choices": [
                {"event_name": "Big Fish", "player_choice": "Banana"},
                {"event_name": "Big Fish", "player_choice": "Donut"},
                {"event_name": "Golden Idol"},
                {"player_choice": "orphaned"},
                17
            ]
        }));
        assert_eq!(tally.events.get("Big Fish"), 2);
        assert_eq!(tally.events.get("Golden Idol"), 1);
        assert_eq!(
            tally.event_player_choices.get("Big Fish").unwrap().get("Banana"),
            1
        );
        assert!(tally.event_player_choices.get("Golden Idol").is_none());
    }

    #[test]
    fn distinct_sets_collect_scalars() {
        let tally = extract(&json!({
            "items_purchased": ["Anchor", "Anchor", 45, [1]],
            "build_version": "2020-07-30"
        }));
        assert_eq!(tally.items_purchased.len(), 2);
        assert!(tally.build_versions.contains("2020-07-30"));
    }
}
