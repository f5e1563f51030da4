//! Dataset definitions: one schema and set of hooks per PBS file.

pub mod connections;
pub mod dungeon;
pub mod encounters;
pub mod forms;
pub mod metadata;
pub mod metrics;
pub mod moves;
pub mod phone;
pub mod plain;
pub mod regional_dexes;
pub mod species;
pub mod town_map;
pub mod trainers;
pub mod types;

use pbsc_core::record::Record;
use pbsc_core::schema::Namespace;
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;

// ---------------------------------------------------------------------------
// Dataset namespaces
// ---------------------------------------------------------------------------

pub const TYPE: Namespace = "Type";
pub const ABILITY: Namespace = "Ability";
pub const MOVE: Namespace = "Move";
pub const ITEM: Namespace = "Item";
pub const BERRY_PLANT: Namespace = "BerryPlant";
pub const SPECIES: Namespace = "Species";
pub const SPECIES_METRICS: Namespace = "SpeciesMetrics";
pub const SHADOW_POKEMON: Namespace = "ShadowPokemon";
pub const REGIONAL_DEX: Namespace = "RegionalDex";
pub const RIBBON: Namespace = "Ribbon";
pub const ENCOUNTER: Namespace = "Encounter";
pub const TRAINER_TYPE: Namespace = "TrainerType";
pub const TRAINER: Namespace = "Trainer";
pub const TOWN_MAP: Namespace = "TownMap";
pub const MAP_CONNECTION: Namespace = "MapConnection";
pub const PHONE_CONTACT: Namespace = "PhoneContact";
pub const METADATA: Namespace = "Metadata";
pub const PLAYER_METADATA: Namespace = "PlayerMetadata";
pub const MAP_METADATA: Namespace = "MapMetadata";
pub const DUNGEON_TILESET: Namespace = "DungeonTileset";
pub const DUNGEON_PARAMETERS: Namespace = "DungeonParameters";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The text of `field` for every record that sets it, in store order.
pub(crate) fn texts(store: &DataStore, field: &str) -> Vec<String> {
    store
        .each()
        .filter_map(|r| r.str(field))
        .map(str::to_string)
        .collect()
}

/// Remove repeated elements of a list field, keeping first occurrences.
pub(crate) fn dedupe_list(record: &mut Record, field: &str) {
    if let Some(items) = record.get_mut(field).and_then(Value::as_list_mut) {
        let mut seen: Vec<Value> = Vec::with_capacity(items.len());
        items.retain(|item| {
            if seen.contains(item) {
                false
            } else {
                seen.push(item.clone());
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut record = Record::new("FIRE").with(
            "weaknesses",
            Value::List(vec![Value::sym("WATER"), Value::sym("ROCK"), Value::sym("WATER")]),
        );
        dedupe_list(&mut record, "weaknesses");
        assert_eq!(record.list("weaknesses"), &[Value::sym("WATER"), Value::sym("ROCK")]);
        dedupe_list(&mut record, "absent");
        assert!(!record.contains("absent"));
    }

    #[test]
    fn texts_skip_unset_fields() {
        let mut store = DataStore::new(ABILITY);
        store
            .insert(Record::new("STENCH").with("real_name", Value::str("Stench")))
            .unwrap();
        store.insert(Record::new("DRIZZLE")).unwrap();
        assert_eq!(texts(&store, "real_name"), vec!["Stench"]);
    }
}
