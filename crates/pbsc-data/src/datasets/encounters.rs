//! `encounters.txt`: wild encounter tables per map and version.
//!
//! ```text
//! [005,1]        # map 5, version 1
//! Land,21        # encounter type and optional step chance
//! 20,PIDGEY,2,4  # weight, species, min level, optional max level
//! ```
//!
//! Identical slots of one encounter type are merged in phase 2, summing
//! their weights. `type_order` lists the encounter types in file order; a
//! type listed twice in one section starts over with no slots.

use super::{ENCOUNTER, SPECIES};
use crate::catalog::{Catalog, ENCOUNTER_TYPE};
use pbsc_core::compiler::{Dataset, HookContext, insert_record};
use pbsc_core::error::{CompileError, WarningKind};
use pbsc_core::id::Identifier;
use pbsc_core::reader::{BodyLine, SectionReader};
use pbsc_core::record::Record;
use pbsc_core::resolve::{WeightOverflow, Weighted, aggregate_weighted};
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema, TypeSpec};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

// ===========================================================================
// Slots
// ===========================================================================

/// One line of an encounter table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterSlot {
    pub weight: u64,
    pub species: String,
    pub min_level: u64,
    pub max_level: u64,
}

impl EncounterSlot {
    pub fn to_value(&self) -> Value {
        Value::List(vec![
            Value::UInt(self.weight),
            Value::sym(self.species.as_str()),
            Value::UInt(self.min_level),
            Value::UInt(self.max_level),
        ])
    }

    pub fn from_value(value: &Value) -> Option<EncounterSlot> {
        Some(EncounterSlot {
            weight: value.at(0).as_u64()?,
            species: value.at(1).as_str()?.to_string(),
            min_level: value.at(2).as_u64()?,
            max_level: value.at(3).as_u64()?,
        })
    }
}

impl Weighted for EncounterSlot {
    type Key = (String, u64, u64);

    fn key(&self) -> Self::Key {
        (self.species.clone(), self.min_level, self.max_level)
    }

    fn weight(&self) -> u64 {
        self.weight
    }

    fn set_weight(&mut self, weight: u64) {
        self.weight = weight;
    }

    fn tiebreak(&self) -> String {
        self.species.clone()
    }
}

/// Merge identical slots and order them by weight, heaviest first.
pub fn aggregate_slots(slots: &[Value]) -> Result<Vec<Value>, WeightOverflow<(String, u64, u64)>> {
    let parsed: Vec<EncounterSlot> = slots.iter().filter_map(EncounterSlot::from_value).collect();
    Ok(aggregate_weighted(parsed)?.iter().map(EncounterSlot::to_value).collect())
}

// ===========================================================================
// Dataset
// ===========================================================================

pub struct Encounters {
    schema: Schema,
    slot: TypeSpec,
    catalog: Arc<Catalog>,
}

impl Encounters {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CompileError> {
        let schema = Schema::builder(ENCOUNTER)
            .field(SECTION_NAME, "id", "vU")
            .defaults(vec![Value::Nil, Value::UInt(0)])
            .build()?;
        let slot = TypeSpec::parse("vevV", &[SPECIES]).map_err(|e| CompileError::schema(ENCOUNTER, e))?;
        Ok(Self { schema, slot, catalog })
    }

    fn decode_slot(&self, text: &str, cx: &HookContext<'_>) -> Result<EncounterSlot, CompileError> {
        if text.split(',').filter(|t| !t.trim().is_empty()).count() < 3 {
            return Err(cx.grammar(format!("expected \"weight, species, level[, max level]\", got \"{text}\"")));
        }
        let value = cx.decode(text, &self.slot)?;
        let min_level = value.at(2).as_u64().unwrap_or(0);
        let max_level = value.at(3).as_u64().unwrap_or(min_level);
        let max = self.catalog.max_level;
        for level in [min_level, max_level] {
            if level > max {
                return Err(cx.range(format!("level {level} is not valid (max. {max})")));
            }
        }
        if min_level > max_level {
            return Err(cx.consistency(format!("minimum level is greater than maximum level: {text}")));
        }
        Ok(EncounterSlot {
            weight: value.at(0).as_u64().unwrap_or(0),
            species: value.at(1).as_str().unwrap_or_default().to_string(),
            min_level,
            max_level,
        })
    }
}

/// A slot line starts with a number followed by a comma.
fn is_slot_line(text: &str) -> bool {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && text.as_bytes().get(digits) == Some(&b',')
}

impl Dataset for Encounters {
    fn namespace(&self) -> Namespace {
        ENCOUNTER
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
            .ok_or_else(|| CompileError::schema(ENCOUNTER, "no section name field"))?;
        for section in SectionReader::new(cx.file(), text) {
            let section = section?;
            cx.at_section(&section.name, section.line);
            let key = cx.decode_entry(&section.name, section.line, header)?;
            let map = key.at(0).as_u64().unwrap_or(0);
            let version = key.at(1).as_u64().unwrap_or(0);
            let id = Identifier::from(format!("{map}_{version}"));
            if store.exists(&id) {
                return Err(cx.duplicate(&id));
            }

            let mut step_chances: BTreeMap<String, Value> = BTreeMap::new();
            let mut types: BTreeMap<String, Vec<Value>> = BTreeMap::new();
            let mut order: Vec<Value> = Vec::new();
            let mut current: Option<String> = None;
            for line in &section.body {
                let row = match line {
                    BodyLine::Row(row) => row,
                    BodyLine::Entry { key, value } => {
                        cx.at_line(value.line);
                        return Err(cx.grammar(format!("unexpected \"{key} = ...\" in encounters for map {map}")));
                    }
                };
                cx.at_line(row.line);
                if let (Some(kind), true) = (&current, is_slot_line(&row.text)) {
                    let slot = self.decode_slot(&row.text, cx)?;
                    types.entry(kind.clone()).or_default().push(slot.to_value());
                    continue;
                }

                let mut parts = row.text.splitn(2, ',').map(str::trim);
                let name = parts.next().unwrap_or_default();
                let Some(kind) = self.catalog.encounter_type(name) else {
                    return Err(cx.reference(ENCOUNTER_TYPE, name));
                };
                match parts.next().filter(|c| !c.is_empty()) {
                    Some(raw) => {
                        let chance = raw
                            .parse::<u64>()
                            .map_err(|_| cx.grammar(format!("expected a step chance, got \"{raw}\"")))?;
                        step_chances.insert(kind.id.clone(), Value::UInt(chance));
                    }
                    None => {
                        step_chances
                            .entry(kind.id.clone())
                            .or_insert(Value::UInt(kind.trigger_chance));
                    }
                }
                if types.insert(kind.id.clone(), Vec::new()).is_some() {
                    cx.warn(
                        WarningKind::Corrected,
                        format!("encounter type {} listed again for map {map}; its earlier slots are discarded", kind.id),
                    );
                } else {
                    order.push(Value::sym(kind.id.as_str()));
                }
                current = Some(kind.id.clone());
            }

            let types = types.into_iter().map(|(k, v)| (k, Value::List(v))).collect();
            let record = Record::new(id)
                .at_line(section.line)
                .with("map", map)
                .with("version", version)
                .with("step_chances", Value::Map(step_chances))
                .with("type_order", Value::List(order))
                .with("types", Value::Map(types));
            insert_record(store, record, cx)?;
        }
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        for record in store.each_mut() {
            cx.at_record(record);
            let Some(Value::Map(types)) = record.get_mut("types") else {
                continue;
            };
            for (kind, slots) in types.iter_mut() {
                let Some(list) = slots.as_list() else {
                    continue;
                };
                let merged = aggregate_slots(list).map_err(|WeightOverflow { key: (species, min, max) }| {
                    cx.range(format!(
                        "combined weight of {kind} slot {species} (levels {min}-{max}) exceeds {}",
                        u64::MAX
                    ))
                })?;
                *slots = Value::List(merged);
            }
        }
        tracing::debug!(maps = store.len(), "encounter slots aggregated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::symbols::{Layered, SymbolMap};
    use pbsc_core::test_utils::compile_str;

    fn run(text: &str) -> Result<pbsc_core::compiler::Compiled, CompileError> {
        let catalog = Arc::new(Catalog::default());
        let species = SymbolMap::new().with(SPECIES, &["PIDGEY", "RATTATA", "ZUBAT"]);
        let mut symbols = Layered::new();
        symbols.push(catalog.as_ref());
        symbols.push(&species);
        compile_str(&Encounters::new(catalog.clone()).unwrap(), "encounters.txt", text, &symbols)
    }

    fn slots(out: &pbsc_core::compiler::Compiled, id: &str, kind: &str) -> Vec<EncounterSlot> {
        let record = out.store.get(&id.into()).unwrap();
        let types = record.get("types").and_then(Value::as_map).unwrap();
        types[kind]
            .as_list()
            .unwrap()
            .iter()
            .filter_map(EncounterSlot::from_value)
            .collect()
    }

    fn slot(weight: u64, species: &str, min: u64, max: u64) -> EncounterSlot {
        EncounterSlot {
            weight,
            species: species.to_string(),
            min_level: min,
            max_level: max,
        }
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn map_version_types_and_slots() {
        let out = run("[005,1]\nLand,25\n20,PIDGEY,2,4\n10,RATTATA,3\nCave\n50,ZUBAT,8,10\n").unwrap();
        let record = out.store.get(&"5_1".into()).unwrap();
        assert_eq!(record.u64("map"), Some(5));
        assert_eq!(record.u64("version"), Some(1));
        let chances = record.get("step_chances").and_then(Value::as_map).unwrap();
        assert_eq!(chances["Land"], Value::UInt(25));
        assert_eq!(chances["Cave"], Value::UInt(5));
        assert_eq!(slots(&out, "5_1", "Land"), vec![slot(20, "PIDGEY", 2, 4), slot(10, "RATTATA", 3, 3)]);
    }

    #[test]
    fn version_defaults_to_zero() {
        let out = run("[12]\nLand\n20,PIDGEY,2\n").unwrap();
        assert!(out.store.exists(&"12_0".into()));
    }

    #[test]
    fn map_and_version_defined_twice_fails() {
        let result = run("[5]\nLand\n20,PIDGEY,2\n[5,0]\nLand\n20,PIDGEY,2\n");
        assert!(matches!(result, Err(CompileError::Duplicate { id, .. }) if id == "5_0"));
    }

    #[test]
    fn undefined_encounter_type_fails() {
        let result = run("[5]\nSky\n20,PIDGEY,2\n");
        assert!(matches!(result, Err(CompileError::Reference { value, .. }) if value == "Sky"));
    }

    #[test]
    fn slot_before_any_type_is_a_type_line() {
        assert!(matches!(run("[5]\n20,PIDGEY,2\n"), Err(CompileError::Reference { .. })));
    }

    #[test]
    fn level_checks() {
        assert!(matches!(run("[5]\nLand\n20,PIDGEY,101\n"), Err(CompileError::Range { .. })));
        assert!(matches!(run("[5]\nLand\n20,PIDGEY,5,101\n"), Err(CompileError::Range { .. })));
        assert!(matches!(run("[5]\nLand\n20,PIDGEY,9,4\n"), Err(CompileError::Consistency { .. })));
        assert!(matches!(run("[5]\nLand\n20,PIDGEY\n"), Err(CompileError::Grammar { .. })));
    }

    // -----------------------------------------------------------------------
    // Aggregation
    // -----------------------------------------------------------------------

    #[test]
    fn identical_slots_merge_and_sort_by_weight() {
        let out = run("[5]\nLand\n20,RATTATA,3,20\n10,PIDGEY,5,25\n40,PIDGEY,5,25\n").unwrap();
        assert_eq!(slots(&out, "5_0", "Land"), vec![slot(50, "PIDGEY", 5, 25), slot(20, "RATTATA", 3, 20)]);
    }

    #[test]
    fn equal_weights_order_by_species() {
        let out = run("[5]\nLand\n10,RATTATA,3\n10,PIDGEY,3\n").unwrap();
        let order: Vec<_> = slots(&out, "5_0", "Land").into_iter().map(|s| s.species).collect();
        assert_eq!(order, ["PIDGEY", "RATTATA"]);
    }

    #[test]
    fn different_level_ranges_stay_apart() {
        let out = run("[5]\nLand\n10,PIDGEY,3\n10,PIDGEY,3,4\n").unwrap();
        assert_eq!(slots(&out, "5_0", "Land").len(), 2);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let once = aggregate_slots(&[
            slot(5, "A", 5, 25).to_value(),
            slot(3, "B", 3, 20).to_value(),
            slot(5, "A", 5, 25).to_value(),
        ])
        .unwrap();
        assert_eq!(aggregate_slots(&once).unwrap(), once);
    }

    #[test]
    fn merged_weight_past_u64_max_fails_naming_the_slot() {
        let result = run("[5]\nLand\n18446744073709551615,PIDGEY,5\n1,PIDGEY,5\n");
        match result {
            Err(CompileError::Range { message, location }) => {
                assert!(message.contains("Land slot PIDGEY (levels 5-5)"), "{message}");
                assert_eq!(location.section.as_deref(), Some("5_0"));
            }
            other => panic!("expected range error, got {other:?}"),
        }
        let out = run("[5]\nLand\n18446744073709551614,PIDGEY,5\n1,PIDGEY,5\n").unwrap();
        assert_eq!(slots(&out, "5_0", "Land"), vec![slot(u64::MAX, "PIDGEY", 5, 5)]);
    }

    // -----------------------------------------------------------------------
    // Type blocks
    // -----------------------------------------------------------------------

    #[test]
    fn types_keep_file_order() {
        let out = run("[5]\nWater\n60,ZUBAT,5\nLand\n20,PIDGEY,2\nCave\n10,RATTATA,3\n").unwrap();
        let record = out.store.get(&"5_0".into()).unwrap();
        assert_eq!(record.list("type_order"), &[Value::sym("Water"), Value::sym("Land"), Value::sym("Cave")]);
    }

    #[test]
    fn repeated_type_starts_over() {
        let out = run("[5]\nLand,30\n20,PIDGEY,2\nCave\n10,ZUBAT,3\nLand\n40,RATTATA,4\n").unwrap();
        assert_eq!(slots(&out, "5_0", "Land"), vec![slot(40, "RATTATA", 4, 4)]);
        let record = out.store.get(&"5_0".into()).unwrap();
        assert_eq!(record.list("type_order"), &[Value::sym("Land"), Value::sym("Cave")]);
        let chances = record.get("step_chances").and_then(Value::as_map).unwrap();
        assert_eq!(chances["Land"], Value::UInt(30));
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::Corrected);
    }
}
