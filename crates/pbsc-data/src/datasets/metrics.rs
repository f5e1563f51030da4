use super::{SPECIES, SPECIES_METRICS};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::record::Record;
use pbsc_core::resolve::split_variant;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::value::Value;

/// `pokemon_metrics.txt`: sprite offsets per species or form. `[SPECIES]`
/// and `[SPECIES,0]` are the same record.
pub struct SpeciesMetrics {
    schema: Schema,
}

impl SpeciesMetrics {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(SPECIES_METRICS)
            .enum_field(SECTION_NAME, "id", "eV", &[SPECIES])
            .field("BackSprite", "back_sprite", "ii")
            .field("FrontSprite", "front_sprite", "ii")
            .field("FrontSpriteAltitude", "front_sprite_altitude", "i")
            .field("ShadowX", "shadow_x", "i")
            .field("ShadowSize", "shadow_size", "u")
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for SpeciesMetrics {
    fn namespace(&self) -> Namespace {
        SPECIES_METRICS
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        let (species, form, id) = split_variant(&record.id, true)
            .ok_or_else(|| cx.grammar(format!("expected [species] or [species,form], got [{}]", record.id)))?;
        record.id = id;
        record.set("species", Value::sym(species));
        record.set("form", form);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::symbols::SymbolMap;
    use pbsc_core::test_utils::compile_str;

    fn run(text: &str) -> Result<pbsc_core::compiler::Compiled, CompileError> {
        let symbols = SymbolMap::new().with(SPECIES, &["PIKACHU", "UNOWN"]);
        compile_str(&SpeciesMetrics::new().unwrap(), "pokemon_metrics.txt", text, &symbols)
    }

    #[test]
    fn base_and_form_records_get_variant_ids() {
        let out = run("[PIKACHU]\nBackSprite = 0,-4\nShadowSize = 2\n[UNOWN,3]\nFrontSpriteAltitude = 8\n").unwrap();
        let pikachu = out.store.get(&"PIKACHU".into()).unwrap();
        assert_eq!(pikachu.get("back_sprite"), Some(&Value::List(vec![Value::Int(0), Value::Int(-4)])));
        assert_eq!(pikachu.u64("form"), Some(0));
        let unown = out.store.get(&"UNOWN_3".into()).unwrap();
        assert_eq!(unown.str("species"), Some("UNOWN"));
        assert_eq!(unown.u64("form"), Some(3));
    }

    #[test]
    fn form_zero_collides_with_base() {
        let result = run("[PIKACHU]\nShadowSize = 2\n[PIKACHU,0]\nShadowSize = 3\n");
        assert!(matches!(result, Err(CompileError::Duplicate { .. })));
    }

    #[test]
    fn unknown_species_fails() {
        let result = run("[RAICHU]\nShadowSize = 2\n");
        assert!(matches!(result, Err(CompileError::Reference { value, .. }) if value == "RAICHU"));
    }
}
