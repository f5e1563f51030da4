use super::{REGIONAL_DEX, SPECIES};
use pbsc_core::compiler::{Dataset, HookContext, insert_record};
use pbsc_core::error::CompileError;
use pbsc_core::id::Identifier;
use pbsc_core::reader::{BodyLine, SectionReader};
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, SECTION_NAME, Schema};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;

/// `regional_dexes.txt`: `[n]` headers followed by comma-separated species
/// lists. A species may appear only once per dex.
pub struct RegionalDexes {
    schema: Schema,
}

impl RegionalDexes {
    pub fn new() -> Result<Self, CompileError> {
        let schema = Schema::builder(REGIONAL_DEX)
            .field(SECTION_NAME, "id", "u")
            .build()?;
        Ok(Self { schema })
    }
}

impl Dataset for RegionalDexes {
    fn namespace(&self) -> Namespace {
        REGIONAL_DEX
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
            .ok_or_else(|| CompileError::schema(REGIONAL_DEX, "no section name field"))?;
        for section in SectionReader::new(cx.file(), text) {
            let section = section?;
            cx.at_section(&section.name, section.line);
            let number = cx.decode_entry(&section.name, section.line, header)?;
            let Some(number) = number.as_u64() else {
                return Err(cx.grammar(format!("expected a dex number, got [{}]", section.name)));
            };
            let id = Identifier::Num(number);
            if store.exists(&id) {
                return Err(cx.duplicate(&id));
            }

            let mut species: Vec<Value> = Vec::new();
            for line in &section.body {
                let row = match line {
                    BodyLine::Row(row) => row,
                    BodyLine::Entry { key, value } => {
                        cx.at_line(value.line);
                        return Err(cx.grammar(format!("expected a list of species, got \"{key} = ...\"")));
                    }
                };
                cx.at_line(row.line);
                for token in row.text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                    let name = cx
                        .symbols()
                        .resolve(SPECIES, token)
                        .ok_or_else(|| cx.reference(SPECIES, token))?;
                    let name = Value::Sym(name);
                    if species.contains(&name) {
                        return Err(cx.consistency(format!(
                            "species {token} is listed twice in regional dex {number}"
                        )));
                    }
                    species.push(name);
                }
            }

            let record = Record::new(number)
                .at_line(section.line)
                .with("species", Value::List(species));
            insert_record(store, record, cx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::symbols::SymbolMap;
    use pbsc_core::test_utils::compile_str;

    fn run(text: &str) -> Result<pbsc_core::compiler::Compiled, CompileError> {
        let symbols = SymbolMap::new().with(SPECIES, &["BULBASAUR", "IVYSAUR", "VENUSAUR", "PIKACHU"]);
        compile_str(&RegionalDexes::new().unwrap(), "regional_dexes.txt", text, &symbols)
    }

    #[test]
    fn lists_span_lines_in_order() {
        let out = run("[0]\nBULBASAUR,IVYSAUR,\nVENUSAUR\n[1]\nPIKACHU\n").unwrap();
        let kanto = out.store.get(&Identifier::Num(0)).unwrap();
        assert_eq!(
            kanto.list("species"),
            &[Value::sym("BULBASAUR"), Value::sym("IVYSAUR"), Value::sym("VENUSAUR")]
        );
        assert_eq!(out.store.get(&Identifier::Num(1)).unwrap().list("species").len(), 1);
    }

    #[test]
    fn species_repeated_within_a_dex_fails() {
        match run("[0]\nBULBASAUR,IVYSAUR\nBULBASAUR\n") {
            Err(CompileError::Consistency { location, .. }) => assert_eq!(location.line, Some(3)),
            other => panic!("expected consistency error, got {other:?}"),
        }
    }

    #[test]
    fn same_species_in_two_dexes_is_fine() {
        assert!(run("[0]\nPIKACHU\n[1]\nPIKACHU\n").is_ok());
    }

    #[test]
    fn repeated_dex_number_fails() {
        assert!(matches!(run("[0]\nPIKACHU\n[0]\nBULBASAUR\n"), Err(CompileError::Duplicate { .. })));
    }

    #[test]
    fn unknown_species_and_entries_fail() {
        assert!(matches!(run("[0]\nMEW\n"), Err(CompileError::Reference { .. })));
        assert!(matches!(run("[0]\nSpecies = PIKACHU\n"), Err(CompileError::Grammar { .. })));
        assert!(matches!(run("[Kanto]\nPIKACHU\n"), Err(CompileError::Grammar { .. })));
    }
}
