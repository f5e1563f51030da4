//! `pokemon_forms.txt`: alternate forms added to the species store.
//!
//! A form section is `[SPECIES,n]` and becomes the record `SPECIES_n`. It
//! goes through the same normalisation as a species in phase 1. In phase 2,
//! once every form is in, it takes every field it leaves unset from its
//! base species.

use super::species::{NO_METHOD, convert_evolution_parameters, normalize, species_fields, species_of};
use super::{ITEM, MOVE, SPECIES};
use crate::catalog::Catalog;
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::id::Identifier;
use pbsc_core::messages::MessageTable;
use pbsc_core::record::Record;
use pbsc_core::resolve::{Inherit, inherit, synthesize_inverse_edges};
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;
use std::sync::Arc;

/// What a form takes from its base species.
pub const FORM_INHERITANCE: &[Inherit] = &[
    Inherit::Scalar("real_name"),
    Inherit::Scalar("real_category"),
    Inherit::Scalar("real_pokedex_entry"),
    Inherit::Scalar("base_exp"),
    Inherit::Scalar("growth_rate"),
    Inherit::Scalar("gender_ratio"),
    Inherit::Scalar("catch_rate"),
    Inherit::Scalar("happiness"),
    Inherit::Scalar("hatch_steps"),
    Inherit::Scalar("incense"),
    Inherit::Scalar("height"),
    Inherit::Scalar("weight"),
    Inherit::Scalar("color"),
    Inherit::Scalar("shape"),
    Inherit::Scalar("habitat"),
    Inherit::Scalar("generation"),
    Inherit::Collection("types"),
    Inherit::Collection("base_stats"),
    Inherit::Collection("evs"),
    Inherit::Collection("tutor_moves"),
    Inherit::Collection("egg_moves"),
    Inherit::Collection("abilities"),
    Inherit::Collection("hidden_abilities"),
    Inherit::Collection("egg_groups"),
    Inherit::Collection("offspring"),
    Inherit::Collection("flags"),
    Inherit::Collection("moves"),
    Inherit::Collection("evolutions"),
    Inherit::Group(&["wild_item_common", "wild_item_uncommon", "wild_item_rare"]),
];

pub struct SpeciesForms {
    schema: Schema,
    catalog: Arc<Catalog>,
}

impl SpeciesForms {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CompileError> {
        let builder = Schema::builder(SPECIES).enum_field(SECTION_NAME, "id", "ev", &[SPECIES]);
        let schema = species_fields(builder)
            .enum_field("MegaStone", "mega_stone", "e", &[ITEM])
            .enum_field("MegaMove", "mega_move", "e", &[MOVE])
            .field("UnmegaForm", "unmega_form", "u")
            .field("MegaMessage", "mega_message", "u")
            .field("PokedexForm", "pokedex_form", "u")
            .build()?;
        Ok(Self { schema, catalog })
    }
}

impl Dataset for SpeciesForms {
    fn namespace(&self) -> Namespace {
        SPECIES
    }

    fn name(&self) -> &'static str {
        "SpeciesForm"
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let (species, form) = match &record.id {
            Identifier::Compound(parts) => match parts.as_slice() {
                [Identifier::Sym(species), Identifier::Num(form)] => (species.clone(), *form),
                _ => return Err(cx.grammar(format!("expected [species,form], got [{}]", record.id))),
            },
            other => return Err(cx.grammar(format!("expected [species,form], got [{other}]"))),
        };
        let known = cx
            .store(SPECIES)
            .is_some_and(|store| store.exists(&Identifier::from(species.as_str())));
        if !known {
            return Err(cx.reference(SPECIES, species.as_str()));
        }

        record.id = Identifier::variant(&species, form);
        record.set("species", Value::sym(species));
        record.set("form", form);
        normalize(record, &self.catalog);
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let inherited = inherit_from_base(store, cx)?;
        tracing::debug!(inherited, "forms filled from their base species");
        convert_evolution_parameters(store, cx, &self.catalog)?;
        let added = synthesize_inverse_edges(store, "evolutions", NO_METHOD, species_of);
        tracing::debug!(added, "prevolutions synthesized for forms");

        let forms: Vec<&Record> = store.each().filter(|r| r.u64("form").unwrap_or(0) != 0).collect();
        let collect = |field: &str| -> Vec<String> {
            forms.iter().filter_map(|r| r.str(field)).map(str::to_string).collect()
        };
        let (form_names, categories, entries) = (
            collect("real_form_name"),
            collect("real_category"),
            collect("real_pokedex_entry"),
        );
        cx.messages.add_unique(MessageTable::FormNames, form_names);
        cx.messages.add_unique(MessageTable::Categories, categories);
        cx.messages.add_unique(MessageTable::PokedexEntries, entries);
        Ok(())
    }
}

/// Fill every form from the base species record in `store`. Base species
/// are the records whose id is their own species.
fn inherit_from_base(store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<usize, CompileError> {
    let forms: Vec<(Identifier, String)> = store
        .each()
        .map(|r| (r.id.clone(), species_of(r)))
        .filter(|(id, species)| id.to_string() != *species)
        .collect();
    for (id, species) in &forms {
        let Some(base) = store.get(&Identifier::from(species.as_str())).cloned() else {
            if let Some(form) = store.get(id) {
                cx.at_record(form);
            }
            return Err(cx.reference(SPECIES, species.as_str()));
        };
        if let Some(form) = store.get_mut(id) {
            inherit(form, &base, FORM_INHERITANCE);
        }
    }
    Ok(forms.len())
}
