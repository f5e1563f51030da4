//! `trainers.txt`: trainer parties.
//!
//! Each `[TYPE,Name,version]` section holds trainer-level keys (`Items`,
//! `LoseText`) and a list of Pokémon. A `Pokemon = SPECIES,level` line
//! starts a new party member; every other key describes the most recent
//! one, so entries are read in file order rather than grouped by key.

use super::plain::is_poke_ball;
use super::{ABILITY, ITEM, MOVE, SPECIES, TRAINER, TRAINER_TYPE, texts};
use crate::catalog::{Catalog, NATURE, POKEMON_GENDER};
use pbsc_core::compiler::{Dataset, HookContext, UnknownKeyPolicy, insert_record};
use pbsc_core::error::CompileError;
use pbsc_core::id::Identifier;
use pbsc_core::messages::MessageTable;
use pbsc_core::reader::{BodyLine, SectionReader};
use pbsc_core::record::Record;
use pbsc_core::schema::{FieldDescriptor, Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const POKEMON: &str = "Pokemon";
/// Keys describing the trainer rather than a party member.
const TRAINER_KEYS: [&str; 2] = ["Items", "LoseText"];

pub struct Trainers {
    schema: Schema,
    catalog: Arc<Catalog>,
}

impl Trainers {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CompileError> {
        let limits = &catalog.limits;
        let schema = Schema::builder(TRAINER)
            .enum_field(SECTION_NAME, "id", "esU", &[TRAINER_TYPE])
            .enum_field("Items", "items", "*e", &[ITEM])
            .field("LoseText", "real_lose_text", "q")
            .enum_field(POKEMON, "pokemon", "ev", &[SPECIES])
            .field("Form", "form", "u")
            .field("Name", "real_name", "s")
            .enum_field("Moves", "moves", "*e", &[MOVE])
            .enum_field("Ability", "ability", "e", &[ABILITY])
            .field("AbilityIndex", "ability_index", "u")
            .enum_field("Item", "item", "e", &[ITEM])
            .enum_field("Gender", "gender", "e", &[POKEMON_GENDER])
            .enum_field("Nature", "nature", "e", &[NATURE])
            .field("IV", "iv", "uUUUUU")
            .bounded(0, limits.iv_stat_limit as i64)
            .field("EV", "ev", "uUUUUU")
            .bounded(0, limits.ev_stat_limit as i64)
            .field("Happiness", "happiness", "u")
            .bounded(0, limits.max_happiness as i64)
            .field("Shiny", "shininess", "b")
            .field("SuperShiny", "super_shininess", "b")
            .field("Shadow", "shadowness", "b")
            .enum_field("Ball", "poke_ball", "e", &[ITEM])
            .build()?;
        Ok(Self { schema, catalog })
    }

    /// Spread a six-value stat line over the main stats. Stats the line
    /// leaves out take its first value.
    fn stat_map(&self, value: &Value) -> BTreeMap<String, Value> {
        self.catalog
            .main_stats()
            .map(|(id, order)| {
                let v = Some(value.at(order)).filter(|v| !v.is_nil()).unwrap_or(value.at(0));
                (id.to_string(), v.clone())
            })
            .collect()
    }

    /// Checks that need more than the field's own grammar and bounds.
    fn check_member_field(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        cx: &HookContext<'_>,
    ) -> Result<(), CompileError> {
        let limits = &self.catalog.limits;
        match field.key {
            POKEMON => {
                let level = value.at(1).as_u64().unwrap_or(0);
                let max = self.catalog.max_level;
                if level > max {
                    return Err(cx.range(format!("bad level: {level} (must be 1-{max})")));
                }
            }
            "Name" => {
                let name = value.as_str().unwrap_or_default();
                let size = limits.max_name_size;
                if name.chars().count() > size {
                    return Err(cx.range(format!("bad nickname: {name} (must be 1-{size} characters)")));
                }
            }
            "EV" => {
                let total: u64 = self.stat_map(value).values().filter_map(Value::as_u64).sum();
                if total > limits.ev_limit {
                    return Err(cx.range(format!(
                        "total EVs are greater than allowed ({})",
                        limits.ev_limit
                    )));
                }
            }
            "Ball" => {
                let item = value.as_str().unwrap_or_default();
                let is_ball = cx
                    .store(ITEM)
                    .and_then(|items| items.get(&Identifier::from(item)))
                    .is_some_and(is_poke_ball);
                if !is_ball {
                    return Err(cx.consistency(format!("value {item} isn't a defined Poké Ball")));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn compile_trainer(
        &self,
        record: &mut Record,
        body: &[BodyLine],
        cx: &mut HookContext<'_>,
    ) -> Result<(), CompileError> {
        let mut party: Vec<BTreeMap<String, Value>> = Vec::new();
        for line in body {
            let (key, raw) = match line {
                BodyLine::Entry { key, value } => (key.as_str(), value),
                BodyLine::Row(row) => {
                    cx.at_line(row.line);
                    return Err(cx.grammar(format!("expected \"key = value\", got \"{}\"", row.text)));
                }
            };
            cx.at_line(raw.line);
            let Some(field) = self.schema.field(key).filter(|f| !f.is_section_name()) else {
                match cx.options().unknown_keys {
                    UnknownKeyPolicy::Reject => {
                        cx.at_field(key);
                        return Err(cx.grammar(format!("unknown key '{key}' for {TRAINER}")));
                    }
                    UnknownKeyPolicy::Ignore => {
                        tracing::trace!(key, line = raw.line, "ignoring unknown trainer key");
                        continue;
                    }
                }
            };
            let value = cx.decode_entry(&raw.text, raw.line, field)?;
            cx.at_field(field.key);

            if TRAINER_KEYS.contains(&field.key) {
                if record.contains(field.id) {
                    return Err(cx.grammar(format!("key '{key}' may only appear once per trainer")));
                }
                record.set(field.id, value);
                continue;
            }

            self.check_member_field(field, &value, cx)?;
            if field.key == POKEMON {
                let mut member = BTreeMap::new();
                member.insert("species".to_string(), value.at(0).clone());
                member.insert("level".to_string(), value.at(1).clone());
                party.push(member);
                continue;
            }
            let Some(member) = party.last_mut() else {
                return Err(cx.grammar("Pokémon hasn't been defined yet"));
            };
            if member.contains_key(field.id) {
                return Err(cx.grammar(format!("key '{key}' may only appear once per Pokémon")));
            }
            let value = match field.key {
                "IV" | "EV" => Value::Map(self.stat_map(&value)),
                _ => value,
            };
            member.insert(field.id.to_string(), value);
        }

        for member in &mut party {
            if let Some(Value::List(moves)) = member.get_mut("moves") {
                let mut seen: Vec<Value> = Vec::with_capacity(moves.len());
                moves.retain(|m| {
                    let fresh = !seen.contains(m);
                    if fresh {
                        seen.push(m.clone());
                    }
                    fresh
                });
            }
        }
        record.set("pokemon", Value::List(party.into_iter().map(Value::Map).collect()));
        Ok(())
    }
}

impl Dataset for Trainers {
    fn namespace(&self) -> Namespace {
        TRAINER
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn compile_records(
        &self,
        text: &str,
        store: &mut DataStore,
        cx: &mut HookContext<'_>,
    ) -> Result<(), CompileError> {
        let header = self
            .schema
            .section_name()
            .ok_or_else(|| CompileError::schema(TRAINER, "no section name field"))?;
        for section in SectionReader::new(cx.file(), text) {
            let section = section?;
            cx.at_section(&section.name, section.line);
            let key = cx.decode_entry(&section.name, section.line, header)?;
            let trainer_type = key.at(0).as_str().unwrap_or_default().to_string();
            let name = key.at(1).as_str().unwrap_or_default().to_string();
            let version = key.at(2).as_u64().unwrap_or(0);
            let id = Identifier::Compound(vec![
                Identifier::from(trainer_type.as_str()),
                Identifier::from(name.as_str()),
                Identifier::Num(version),
            ]);

            let mut record = Record::new(id)
                .at_line(section.line)
                .with("trainer_type", Value::sym(trainer_type))
                .with("real_name", Value::str(name))
                .with("version", version);
            self.compile_trainer(&mut record, &section.body, cx)?;
            cx.at_section(&section.name, section.line);
            insert_record(store, record, cx)?;
        }
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        if let Some(empty) = store.each().find(|r| r.list("pokemon").is_empty()) {
            cx.at_record(empty);
            return Err(cx.consistency(format!("trainer {} has no Pokémon", empty.id)));
        }
        cx.messages.set_unique(MessageTable::TrainerNames, texts(store, "real_name"));
        cx.messages
            .set_unique(MessageTable::TrainerLoseTexts, texts(store, "real_lose_text"));
        Ok(())
    }
}
