//! Datasets with no validation of their own: abilities, items, berry
//! plants, Shadow Pokémon, ribbons and trainer types.
//!
//! Each is a schema plus the text fields it hands to the message tables.

use super::{ABILITY, BERRY_PLANT, ITEM, MOVE, RIBBON, SHADOW_POKEMON, SPECIES, TRAINER_TYPE, texts};
use crate::catalog::{ITEM_BATTLE_USE, ITEM_FIELD_USE, TRAINER_GENDER};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::messages::MessageTable;
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;

/// A schema whose text fields feed message tables in phase 2.
pub struct Plain {
    schema: Schema,
    messages: &'static [(MessageTable, &'static str)],
}

impl Plain {
    pub fn new(schema: Schema, messages: &'static [(MessageTable, &'static str)]) -> Self {
        Self { schema, messages }
    }
}

impl Dataset for Plain {
    fn namespace(&self) -> Namespace {
        self.schema.dataset()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        for &(table, field) in self.messages {
            cx.messages.set_unique(table, texts(store, field));
        }
        Ok(())
    }
}

pub fn abilities() -> Result<Plain, CompileError> {
    let schema = Schema::builder(ABILITY)
        .field(SECTION_NAME, "id", "m")
        .field("Name", "real_name", "s")
        .field("Description", "real_description", "q")
        .field("Flags", "flags", "*s")
        .build()?;
    Ok(Plain::new(
        schema,
        &[
            (MessageTable::Abilities, "real_name"),
            (MessageTable::AbilityDescriptions, "real_description"),
        ],
    ))
}

pub fn items() -> Result<Plain, CompileError> {
    let schema = Schema::builder(ITEM)
        .field(SECTION_NAME, "id", "m")
        .field("Name", "real_name", "s")
        .field("NamePlural", "real_name_plural", "s")
        .field("Pocket", "pocket", "v")
        .field("Price", "price", "u")
        .field("SellPrice", "sell_price", "u")
        .enum_field("FieldUse", "field_use", "e", &[ITEM_FIELD_USE])
        .enum_field("BattleUse", "battle_use", "e", &[ITEM_BATTLE_USE])
        .field("Consumable", "consumable", "b")
        .field("Flags", "flags", "*s")
        .enum_field("Move", "move", "e", &[MOVE])
        .field("Description", "real_description", "q")
        .build()?;
    Ok(Plain::new(
        schema,
        &[
            (MessageTable::Items, "real_name"),
            (MessageTable::ItemPlurals, "real_name_plural"),
            (MessageTable::ItemDescriptions, "real_description"),
        ],
    ))
}

/// Whether an item record is a Poké Ball.
pub fn is_poke_ball(item: &Record) -> bool {
    item.list("flags")
        .iter()
        .filter_map(|f| f.as_str())
        .any(|f| f == "PokeBall" || f == "SnagBall")
}

pub fn berry_plants() -> Result<Plain, CompileError> {
    let schema = Schema::builder(BERRY_PLANT)
        .enum_field(SECTION_NAME, "id", "e", &[ITEM])
        .field("HoursPerStage", "hours_per_stage", "v")
        .field("DryingPerHour", "drying_per_hour", "u")
        .field("Yield", "yield", "uv")
        .build()?;
    Ok(Plain::new(schema, &[]))
}

pub fn shadow_pokemon() -> Result<Plain, CompileError> {
    let schema = Schema::builder(SHADOW_POKEMON)
        .enum_field(SECTION_NAME, "id", "e", &[SPECIES])
        .field("GaugeSize", "gauge_size", "v")
        .enum_field("Moves", "moves", "*e", &[MOVE])
        .field("Flags", "flags", "*s")
        .build()?;
    Ok(Plain::new(schema, &[]))
}

pub fn ribbons() -> Result<Plain, CompileError> {
    let schema = Schema::builder(RIBBON)
        .field(SECTION_NAME, "id", "m")
        .field("Name", "real_name", "s")
        .field("IconPosition", "icon_position", "u")
        .field("Description", "real_description", "q")
        .field("Flags", "flags", "*s")
        .build()?;
    Ok(Plain::new(
        schema,
        &[
            (MessageTable::Ribbons, "real_name"),
            (MessageTable::RibbonDescriptions, "real_description"),
        ],
    ))
}

pub fn trainer_types() -> Result<Plain, CompileError> {
    let schema = Schema::builder(TRAINER_TYPE)
        .field(SECTION_NAME, "id", "m")
        .field("Name", "real_name", "s")
        .enum_field("Gender", "gender", "e", &[TRAINER_GENDER])
        .field("BaseMoney", "base_money", "u")
        .field("SkillLevel", "skill_level", "u")
        .field("Flags", "flags", "*s")
        .field("IntroBGM", "intro_bgm", "s")
        .field("BattleBGM", "battle_bgm", "s")
        .field("VictoryBGM", "victory_bgm", "s")
        .build()?;
    Ok(Plain::new(schema, &[(MessageTable::TrainerTypes, "real_name")]))
}
