//! `pokemon.txt`: species, their evolutions and prevolutions.
//!
//! Evolutions are stored as `[species, method, parameter, is_prevolution]`
//! edges. Phase 1 records every written edge as a forward one; phase 2
//! interprets each parameter according to its method, then gives every
//! evolved species an inverse edge back to the species it evolves from.

use super::{ABILITY, ITEM, MOVE, SPECIES, TYPE, texts};
use crate::catalog::{
    BODY_COLOR, BODY_SHAPE, Catalog, EGG_GROUP, EVOLUTION, GENDER_RATIO, GROWTH_RATE, HABITAT,
    ParameterKind, STAT,
};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::id::Identifier;
use pbsc_core::messages::MessageTable;
use pbsc_core::record::Record;
use pbsc_core::resolve::synthesize_inverse_edges;
use pbsc_core::schema::{Namespace, SECTION_NAME, Scalar, Schema, SchemaBuilder, Slot, TypeSpec};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Method of an edge added to a species that had no edge to one of its
/// evolutions.
pub const NO_METHOD: &str = "None";

/// Fields shared by `pokemon.txt` and `pokemon_forms.txt`, after the
/// section name.
pub(crate) fn species_fields(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .field("Name", "real_name", "s")
        .field("FormName", "real_form_name", "q")
        .field("Category", "real_category", "s")
        .field("Pokedex", "real_pokedex_entry", "q")
        .enum_field("Types", "types", "eE", &[TYPE, TYPE])
        .field("BaseStats", "base_stats", "vvvvvv")
        .enum_field("GenderRatio", "gender_ratio", "e", &[GENDER_RATIO])
        .enum_field("GrowthRate", "growth_rate", "e", &[GROWTH_RATE])
        .field("BaseExp", "base_exp", "v")
        .enum_field("EVs", "evs", "*ev", &[STAT])
        .field("CatchRate", "catch_rate", "u")
        .bounded(0, 255)
        .field("Happiness", "happiness", "u")
        .bounded(0, 255)
        .enum_field("Abilities", "abilities", "*e", &[ABILITY])
        .enum_field("HiddenAbilities", "hidden_abilities", "*e", &[ABILITY])
        .enum_field("Moves", "moves", "*ue", &[MOVE])
        .enum_field("TutorMoves", "tutor_moves", "*e", &[MOVE])
        .enum_field("EggMoves", "egg_moves", "*e", &[MOVE])
        .enum_field("EggGroups", "egg_groups", "*e", &[EGG_GROUP])
        .field("HatchSteps", "hatch_steps", "v")
        .enum_field("Incense", "incense", "e", &[ITEM])
        .enum_field("Offspring", "offspring", "*e", &[SPECIES])
        .field("Height", "height", "f")
        .field("Weight", "weight", "f")
        .enum_field("Color", "color", "e", &[BODY_COLOR])
        .enum_field("Shape", "shape", "e", &[BODY_SHAPE])
        .enum_field("Habitat", "habitat", "e", &[HABITAT])
        .field("Generation", "generation", "i")
        .field("Flags", "flags", "*s")
        .enum_field("WildItemCommon", "wild_item_common", "*e", &[ITEM])
        .enum_field("WildItemUncommon", "wild_item_uncommon", "*e", &[ITEM])
        .enum_field("WildItemRare", "wild_item_rare", "*e", &[ITEM])
        .enum_field("Evolutions", "evolutions", "*ees", &[SPECIES, EVOLUTION])
}

/// The species a record belongs to: its `species` field, or its id.
pub(crate) fn species_of(record: &Record) -> String {
    record
        .str("species")
        .map(str::to_string)
        .unwrap_or_else(|| record.id.to_string())
}

// ===========================================================================
// Normalisation
// ===========================================================================

/// Per-record normalisation shared by species and forms.
///
/// - base stats become a stat → value map (missing stats are 1)
/// - EVs become a stat → value map (missing stats are 0)
/// - height and weight become integer tenths, at least 1
/// - every written evolution is marked as a forward edge
/// - repeated types are dropped
pub(crate) fn normalize(record: &mut Record, catalog: &Catalog) {
    if let Some(stats) = record.get("base_stats").and_then(Value::as_list) {
        let map: BTreeMap<String, Value> = catalog
            .main_stats()
            .map(|(id, order)| {
                let value = stats.get(order).filter(|v| !v.is_nil()).cloned();
                (id.to_string(), value.unwrap_or(Value::UInt(1)))
            })
            .collect();
        record.set("base_stats", Value::Map(map));
    }

    if let Some(pairs) = record.get("evs").and_then(Value::as_list) {
        let mut map: BTreeMap<String, Value> = pairs
            .iter()
            .filter_map(|pair| Some((pair.at(0).as_str()?.to_string(), pair.at(1).clone())))
            .collect();
        for (id, _) in catalog.main_stats() {
            map.entry(id.to_string()).or_insert(Value::UInt(0));
        }
        record.set("evs", Value::Map(map));
    }

    for field in ["height", "weight"] {
        if let Some(value) = record.value(field).and_then(Value::as_f64) {
            let tenths = (value * 10.0).round().max(1.0) as u64;
            record.set(field, Value::UInt(tenths));
        }
    }

    if let Some(evolutions) = record.get_mut("evolutions").and_then(Value::as_list_mut) {
        for evolution in evolutions.iter_mut() {
            if let Some(parts) = evolution.as_list_mut() {
                parts.resize(3, Value::Nil);
                parts.push(Value::Bool(false));
            }
        }
    }

    if let Some(types) = record.get("types").and_then(Value::as_list) {
        let mut unique: Vec<Value> = Vec::with_capacity(types.len());
        for t in types.iter().filter(|t| !t.is_nil()) {
            if !unique.contains(t) {
                unique.push(t.clone());
            }
        }
        record.set("types", Value::List(unique));
    }
}

// ===========================================================================
// Evolution parameters
// ===========================================================================

/// Interpret every forward edge's parameter according to its method:
/// dropped, a positive integer, kept as text, or a member of the method's
/// namespace. Already-converted parameters are left alone, so this can run
/// again after forms are added.
pub(crate) fn convert_evolution_parameters(
    store: &mut DataStore,
    cx: &mut HookContext<'_>,
    catalog: &Catalog,
) -> Result<(), CompileError> {
    let positive = TypeSpec::Single(Slot {
        scalar: Scalar::PosInt,
        optional: false,
    });
    for id in store.ids() {
        let Some(record) = store.get(&id) else {
            continue;
        };
        let mut evolutions = record.list("evolutions").to_vec();
        if evolutions.is_empty() {
            continue;
        }
        cx.at_record(record);
        cx.at_field("Evolutions");
        for evolution in &mut evolutions {
            let Some(parts) = evolution.as_list_mut() else {
                continue;
            };
            if parts.len() < 3 || parts.get(3).and_then(Value::as_bool) == Some(true) {
                continue;
            }
            let method = parts[1].as_str().unwrap_or_default();
            let method = catalog
                .evolution_method(method)
                .ok_or_else(|| cx.reference(EVOLUTION, method))?;
            parts[2] = match (&method.parameter, &parts[2]) {
                (ParameterKind::None, _) => Value::Nil,
                (ParameterKind::Integer, Value::Str(raw)) => cx.decode(raw.trim(), &positive)?,
                (ParameterKind::Enum(namespace), Value::Str(raw)) => {
                    resolve_parameter(store, cx, namespace, raw.trim())?
                }
                (_, other) => other.clone(),
            };
        }
        if let Some(record) = store.get_mut(&id) {
            record.set("evolutions", Value::List(evolutions));
        }
    }
    Ok(())
}

fn resolve_parameter(
    store: &DataStore,
    cx: &HookContext<'_>,
    namespace: &str,
    token: &str,
) -> Result<Value, CompileError> {
    if namespace == cx.namespace() {
        return if store.exists(&Identifier::from(token)) {
            Ok(Value::sym(token))
        } else {
            Err(cx.reference(namespace, token))
        };
    }
    cx.symbols()
        .resolve(namespace, token)
        .map(Value::Sym)
        .ok_or_else(|| cx.reference(namespace, token))
}

// ===========================================================================
// Dataset
// ===========================================================================

pub struct Species {
    schema: Schema,
    catalog: Arc<Catalog>,
}

impl Species {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CompileError> {
        let builder = Schema::builder(SPECIES).field(SECTION_NAME, "id", "m");
        let schema = species_fields(builder).build()?;
        Ok(Self { schema, catalog })
    }
}

impl Dataset for Species {
    fn namespace(&self) -> Namespace {
        SPECIES
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, _cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let species = record.id.to_string();
        record.set("species", Value::sym(species));
        record.set("form", 0u64);
        normalize(record, &self.catalog);
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        convert_evolution_parameters(store, cx, &self.catalog)?;
        let added = synthesize_inverse_edges(store, "evolutions", NO_METHOD, species_of);
        tracing::debug!(added, "prevolutions synthesized");

        cx.messages.set_unique(MessageTable::Species, texts(store, "real_name"));
        cx.messages.set_unique(MessageTable::FormNames, texts(store, "real_form_name"));
        cx.messages.set_unique(MessageTable::Categories, texts(store, "real_category"));
        cx.messages
            .set_unique(MessageTable::PokedexEntries, texts(store, "real_pokedex_entry"));
        Ok(())
    }
}
