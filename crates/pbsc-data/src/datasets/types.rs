use super::{TYPE, dedupe_list, texts};
use pbsc_core::compiler::{Dataset, HookContext};
use pbsc_core::error::CompileError;
use pbsc_core::messages::MessageTable;
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;

const MATCHUPS: [&str; 3] = ["weaknesses", "resistances", "immunities"];

/// `types.txt`. Matchup lists name other types of the same file, so they
/// are checked once every type is in.
pub struct Types {
    schema: Schema,
}

impl Types {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(TYPE)
            .field(SECTION_NAME, "id", "m")
            .field("Name", "real_name", "s")
            .field("IconPosition", "icon_position", "u")
            .field("IsSpecialType", "special_type", "b")
            .field("IsPseudoType", "pseudo_type", "b")
            .field("Flags", "flags", "*s")
            .enum_field("Weaknesses", "weaknesses", "*e", &[TYPE])
            .enum_field("Resistances", "resistances", "*e", &[TYPE])
            .enum_field("Immunities", "immunities", "*e", &[TYPE])
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for Types {
    fn namespace(&self) -> Namespace {
        TYPE
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn local_validate(&self, record: &mut Record, _cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        for field in MATCHUPS {
            dedupe_list(record, field);
        }
        Ok(())
    }

    fn global_validate(&self, store: &mut DataStore, cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        cx.messages.set_unique(MessageTable::Types, texts(store, "real_name"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::symbols::NoSymbols;
    use pbsc_core::test_utils::compile_str;
    use pbsc_core::value::Value;

    const CHART: &str = "\
[NORMAL]
Name = Normal
IconPosition = 0
Weaknesses = FIGHTING
Immunities = GHOST
#-------------------------------
[FIGHTING]
Name = Fighting
IconPosition = 1
Resistances = ROCK,ROCK
#-------------------------------
[ROCK]
Name = Rock
IconPosition = 2
Weaknesses = FIGHTING
#-------------------------------
[GHOST]
Name = Ghost
IconPosition = 3
Immunities = NORMAL,FIGHTING
";

    #[test]
    fn chart_compiles_with_forward_references() {
        let out = compile_str(&Types::new().unwrap(), "types.txt", CHART, &NoSymbols).unwrap();
        assert_eq!(out.store.len(), 4);
        let normal = out.store.get(&"NORMAL".into()).unwrap();
        assert_eq!(normal.list("weaknesses"), &[Value::sym("FIGHTING")]);
        let fighting = out.store.get(&"FIGHTING".into()).unwrap();
        assert_eq!(fighting.list("resistances"), &[Value::sym("ROCK")]);
        assert_eq!(out.messages.get(MessageTable::Types).unwrap().len(), 4);
    }

    #[test]
    fn undefined_matchup_names_type_record_and_key() {
        let text = "[NORMAL]\nName = Normal\n[ROCK]\nName = Rock\nResistances = NORMAL,FLYING\n";
        match compile_str(&Types::new().unwrap(), "types.txt", text, &NoSymbols) {
            Err(CompileError::Reference {
                namespace,
                value,
                location,
            }) => {
                assert_eq!(namespace, "Type");
                assert_eq!(value, "FLYING");
                assert_eq!(location.section.as_deref(), Some("ROCK"));
                assert_eq!(location.field.as_deref(), Some("Resistances"));
                assert_eq!(location.line, Some(3));
            }
            other => panic!("expected reference error, got {other:?}"),
        }
    }
}
