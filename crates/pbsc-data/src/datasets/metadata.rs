//! `metadata.txt` and `map_metadata.txt`.
//!
//! `metadata.txt` mixes two datasets: section `[0]` is the global metadata
//! and every other section describes a player character. Both are compiled
//! from the same text, each accepting only its own sections.

use super::{ITEM, MAP_METADATA, METADATA, PLAYER_METADATA, TRAINER_TYPE};
use crate::catalog::{Catalog, ENVIRONMENT, WEATHER};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::{CompileError, WarningKind};
use pbsc_core::id::Identifier;
use pbsc_core::messages::MessageTable;
use pbsc_core::reader::Section;
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;
use std::sync::Arc;

const GLOBAL_ID: u64 = 0;
const FIRST_PLAYER: u64 = 1;

/// Whether `section` is the global metadata section. Names that are not a
/// number are left to the global schema, which rejects them.
fn is_global(section: &Section) -> bool {
    section.name.trim().parse::<u64>().map_or(true, |n| n == GLOBAL_ID)
}

// ===========================================================================
// Global metadata
// ===========================================================================

pub struct Metadata {
    schema: Schema,
}

impl Metadata {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(METADATA)
            .field(SECTION_NAME, "id", "u")
            .field("StartMoney", "start_money", "u")
            .enum_field("StartItemStorage", "start_item_storage", "*e", &[ITEM])
            .field("Home", "home", "vuuu")
            .field("StorageCreator", "real_storage_creator", "s")
            .field("WildBattleBGM", "wild_battle_bgm", "s")
            .field("TrainerBattleBGM", "trainer_battle_bgm", "s")
            .field("WildVictoryBGM", "wild_victory_bgm", "s")
            .field("TrainerVictoryBGM", "trainer_victory_bgm", "s")
            .field("WildCaptureME", "wild_capture_me", "s")
            .field("SurfBGM", "surf_bgm", "s")
            .field("BicycleBGM", "bicycle_bgm", "s")
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for Metadata {
    fn namespace(&self) -> Namespace {
        METADATA
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn accepts(&self, section: &Section) -> bool {
        is_global(section)
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        if record.is_unset("home") {
            cx.at_field("Home");
            return Err(cx.consistency("the entry 'Home' is required in metadata section 0"));
        }
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let Some(global) = store.get(&Identifier::Num(GLOBAL_ID)) else {
            return Err(cx.consistency("global metadata is not defined but should be"));
        };
        let creator = global.str("real_storage_creator").map(str::to_string);
        cx.messages.set(MessageTable::StorageCreator, vec![creator]);
        Ok(())
    }
}

// ===========================================================================
// Player metadata
// ===========================================================================

pub struct PlayerMetadata {
    schema: Schema,
}

impl PlayerMetadata {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(PLAYER_METADATA)
            .field(SECTION_NAME, "id", "u")
            .enum_field("TrainerType", "trainer_type", "e", &[TRAINER_TYPE])
            .field("WalkCharset", "walk_charset", "s")
            .field("RunCharset", "run_charset", "s")
            .field("CycleCharset", "cycle_charset", "s")
            .field("SurfCharset", "surf_charset", "s")
            .field("DiveCharset", "dive_charset", "s")
            .field("FishCharset", "fish_charset", "s")
            .field("SurfFishCharset", "surf_fish_charset", "s")
            .field("Home", "home", "vuuu")
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for PlayerMetadata {
    fn namespace(&self) -> Namespace {
        PLAYER_METADATA
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn accepts(&self, section: &Section) -> bool {
        !is_global(section)
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        if !store.exists(&Identifier::Num(FIRST_PLAYER)) {
            return Err(cx.consistency("metadata for player character 1 is not defined but should be"));
        }
        Ok(())
    }
}

// ===========================================================================
// Map metadata
// ===========================================================================

/// `map_metadata.txt`. A map without a `Name` takes its name from the
/// catalog's map list.
pub struct MapMetadata {
    schema: Schema,
    catalog: Arc<Catalog>,
}

impl MapMetadata {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CompileError> {
        let schema = Schema::builder(MAP_METADATA)
            .field(SECTION_NAME, "id", "v")
            .field("Name", "real_name", "s")
            .field("Outdoor", "outdoor_map", "b")
            .field("ShowArea", "announce_location", "b")
            .field("Bicycle", "can_bicycle", "b")
            .field("BicycleAlways", "always_bicycle", "b")
            .field("HealingSpot", "teleport_destination", "vuu")
            .enum_field("Weather", "weather", "eu", &[WEATHER])
            .field("MapPosition", "town_map_position", "uuu")
            .field("DiveMap", "dive_map_id", "v")
            .field("DarkMap", "dark_map", "b")
            .field("SafariMap", "safari_map", "b")
            .field("SnapEdges", "snap_edges", "b")
            .field("Dungeon", "random_dungeon", "b")
            .field("BattleBack", "battle_background", "s")
            .field("WildBattleBGM", "wild_battle_bgm", "s")
            .field("TrainerBattleBGM", "trainer_battle_bgm", "s")
            .field("WildVictoryBGM", "wild_victory_bgm", "s")
            .field("TrainerVictoryBGM", "trainer_victory_bgm", "s")
            .field("WildCaptureME", "wild_capture_me", "s")
            .field("MapSize", "town_map_size", "us")
            .enum_field("Environment", "battle_environment", "e", &[ENVIRONMENT])
            .field("Flags", "flags", "*s")
            .build()?;
        Ok(Self { schema, catalog })
    }
}

impl Dataset for MapMetadata {
    fn namespace(&self) -> Namespace {
        MAP_METADATA
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let Some(map) = record.id.as_num() else {
            return Ok(());
        };
        if self.catalog.knows_maps() && !self.catalog.has_map(map) {
            cx.warn(WarningKind::MissingAsset, format!("map {map} has metadata but does not exist"));
        }
        if record.str("real_name").is_none_or(str::is_empty) {
            if let Some(name) = self.catalog.map_name(map) {
                record.set("real_name", Value::str(name));
            }
        }
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let mut names: Vec<Option<String>> = Vec::new();
        for map in store.each() {
            let Some(index) = map.id.as_num().map(|n| n as usize) else {
                continue;
            };
            if names.len() <= index {
                names.resize(index + 1, None);
            }
            names[index] = map.str("real_name").map(str::to_string);
        }
        tracing::debug!(named = names.iter().flatten().count(), "map names collected");
        cx.messages.set(MessageTable::MapNames, names);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::compiler::{CompileEnv, Compiled, compile};
    use pbsc_core::messages::MessageList;
    use pbsc_core::symbols::{Layered, SymbolMap};
    use pbsc_core::test_utils::compile_str;

    const METADATA_TEXT: &str = "\
[0]
Home = 3,7,5,8
StorageCreator = Bill
StartMoney = 3000
[1]
TrainerType = POKEMONTRAINER_Red
WalkCharset = trainer_POKEMONTRAINER_Red
[2]
TrainerType = POKEMONTRAINER_Leaf
";

    fn symbols() -> SymbolMap {
        SymbolMap::new()
            .with(TRAINER_TYPE, &["POKEMONTRAINER_Red", "POKEMONTRAINER_Leaf"])
            .with(ITEM, &["POTION"])
    }

    // -----------------------------------------------------------------------
    // metadata.txt
    // -----------------------------------------------------------------------

    #[test]
    fn one_file_splits_into_global_and_player_metadata() {
        let symbols = symbols();
        let global = compile_str(&Metadata::new().unwrap(), "metadata.txt", METADATA_TEXT, &symbols).unwrap();
        assert_eq!(global.store.len(), 1);
        let zero = global.store.get(&Identifier::Num(0)).unwrap();
        assert_eq!(zero.u64("start_money"), Some(3000));
        match global.messages.get(MessageTable::StorageCreator) {
            Some(MessageList::Indexed(names)) => assert_eq!(names, &[Some("Bill".to_string())]),
            other => panic!("expected indexed storage creator, got {other:?}"),
        }

        let players = compile_str(&PlayerMetadata::new().unwrap(), "metadata.txt", METADATA_TEXT, &symbols).unwrap();
        assert_eq!(players.store.len(), 2);
        let red = players.store.get(&Identifier::Num(1)).unwrap();
        assert_eq!(red.get("trainer_type"), Some(&Value::sym("POKEMONTRAINER_Red")));
    }

    #[test]
    fn home_is_required() {
        let result = compile_str(&Metadata::new().unwrap(), "metadata.txt", "[0]\nStartMoney = 5\n", &symbols());
        match result {
            Err(CompileError::Consistency { location, .. }) => {
                assert_eq!(location.field.as_deref(), Some("Home"));
            }
            other => panic!("expected consistency error, got {other:?}"),
        }
    }

    #[test]
    fn global_and_first_player_must_exist() {
        let players_only = "[1]\nTrainerType = POKEMONTRAINER_Red\n";
        assert!(compile_str(&Metadata::new().unwrap(), "metadata.txt", players_only, &symbols()).is_err());
        let global_only = "[0]\nHome = 3,7,5,8\n[2]\nTrainerType = POKEMONTRAINER_Leaf\n";
        let result = compile_str(&PlayerMetadata::new().unwrap(), "metadata.txt", global_only, &symbols());
        assert!(matches!(result, Err(CompileError::Consistency { .. })));
    }

    #[test]
    fn global_section_used_twice_fails() {
        let text = "[0]\nHome = 3,7,5,8\n[000]\nHome = 3,7,5,8\n";
        let result = compile_str(&Metadata::new().unwrap(), "metadata.txt", text, &symbols());
        assert!(matches!(result, Err(CompileError::Duplicate { .. })));
    }

    // -----------------------------------------------------------------------
    // map_metadata.txt
    // -----------------------------------------------------------------------

    fn maps(catalog: Catalog, text: &str) -> Compiled {
        let catalog = Arc::new(catalog);
        let mut layered = Layered::new();
        layered.push(catalog.as_ref());
        let dataset = MapMetadata::new(catalog.clone()).unwrap();
        let env = CompileEnv::new("map_metadata.txt", &layered);
        compile(&dataset, text, DataStore::new(MAP_METADATA), env).unwrap()
    }

    #[test]
    fn names_come_from_the_catalog_when_missing() {
        let mut catalog = Catalog::default();
        catalog.map_names.insert(2, "Lappet Town".into());
        catalog.map_names.insert(3, "Route 1".into());
        let out = maps(catalog, "[2]\nOutdoor = true\nWeather = Rain,40\n[3]\nName = Route One\n[5]\nDarkMap = yes\n");

        let lappet = out.store.get(&Identifier::Num(2)).unwrap();
        assert_eq!(lappet.str("real_name"), Some("Lappet Town"));
        assert_eq!(lappet.get("weather"), Some(&Value::List(vec![Value::sym("Rain"), Value::UInt(40)])));
        let route = out.store.get(&Identifier::Num(3)).unwrap();
        assert_eq!(route.str("real_name"), Some("Route One"));

        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::MissingAsset);
        match out.messages.get(MessageTable::MapNames) {
            Some(MessageList::Indexed(names)) => {
                assert_eq!(names.len(), 6);
                assert_eq!(names[3].as_deref(), Some("Route One"));
                assert_eq!(names[5], None);
            }
            other => panic!("expected indexed map names, got {other:?}"),
        }
    }

    #[test]
    fn map_zero_is_invalid() {
        let catalog = Arc::new(Catalog::default());
        let dataset = MapMetadata::new(catalog.clone()).unwrap();
        let result = compile_str(&dataset, "map_metadata.txt", "[0]\nOutdoor = true\n", catalog.as_ref());
        assert!(matches!(result, Err(CompileError::Range { .. })));
    }
}
