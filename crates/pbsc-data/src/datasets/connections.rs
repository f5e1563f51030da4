use super::MAP_CONNECTION;
use crate::catalog::{Catalog, DIRECTION};
use pbsc_core::compiler::{Dataset, HookContext, insert_record};
use pbsc_core::error::{CompileError, WarningKind};
use pbsc_core::reader::prepped_lines;
use pbsc_core::record::Record;
use pbsc_core::schema::{Namespace, Schema};
use pbsc_core::store::DataStore;
use pbsc_core::value::Value;
use std::sync::Arc;

const FIELDS: [&str; 6] = ["map1", "side1", "pos1", "map2", "side2", "pos2"];

/// `map_connections.txt`: one connection per line,
/// `map, side, position, map, side, position`. A side is a direction (or
/// its full name) or a raw edge offset.
pub struct MapConnections {
    schema: Schema,
    catalog: Arc<Catalog>,
}

impl MapConnections {
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, CompileError> {
        let schema = Schema::builder(MAP_CONNECTION)
            .enum_field("Connection", "connection", "uyiuyi", &[DIRECTION, DIRECTION])
            .build()?;
        Ok(Self { schema, catalog })
    }
}

/// The side a connection from `side` must arrive on.
fn opposite(side: &str) -> Option<&'static str> {
    match side {
        "N" => Some("S"),
        "S" => Some("N"),
        "E" => Some("W"),
        "W" => Some("E"),
        _ => None,
    }
}

fn side_name(side: &str) -> &str {
    match side {
        "N" => "North",
        "S" => "South",
        "E" => "East",
        "W" => "West",
        other => other,
    }
}

impl Dataset for MapConnections {
    fn namespace(&self) -> Namespace {
        MAP_CONNECTION
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
        let field = self
            .schema
            .field("Connection")
            .ok_or_else(|| CompileError::schema(MAP_CONNECTION, "no Connection field"))?;
        for (index, (line, row)) in prepped_lines(text).enumerate() {
            cx.at_line(line);
            let value = cx.decode_entry(row, line, field)?;

            if let (Some(from), Some(to)) = (value.at(1).as_str(), value.at(4).as_str()) {
                let expected = opposite(from).unwrap_or_default();
                if to != expected {
                    return Err(cx.consistency(format!(
                        "{} side of first map must connect with {} side of second map",
                        side_name(from),
                        side_name(expected).to_lowercase()
                    )));
                }
            }
            if self.catalog.knows_maps() {
                for map in [value.at(0), value.at(3)].into_iter().filter_map(Value::as_u64) {
                    if !self.catalog.has_map(map) {
                        cx.warn(
                            WarningKind::MissingAsset,
                            format!("map {map}, as mentioned in the map connection data, was not found"),
                        );
                    }
                }
            }

            let mut record = Record::new(index as u64).at_line(line);
            for (i, name) in FIELDS.into_iter().enumerate() {
                record.set(name, value.at(i).clone());
            }
            insert_record(store, record, cx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsc_core::id::Identifier;
    use pbsc_core::test_utils::compile_str;

    fn run_with(catalog: Catalog, text: &str) -> Result<pbsc_core::compiler::Compiled, CompileError> {
        let catalog = Arc::new(catalog);
        let dataset = MapConnections::new(catalog.clone()).unwrap();
        compile_str(&dataset, "map_connections.txt", text, catalog.as_ref())
    }

    fn run(text: &str) -> Result<pbsc_core::compiler::Compiled, CompileError> {
        run_with(Catalog::default(), text)
    }

    #[test]
    fn every_direction_pairs_with_its_opposite() {
        for (from, to) in [("N", "S"), ("S", "N"), ("E", "W"), ("West", "East")] {
            let out = run(&format!("2,{from},0,5,{to},0\n")).unwrap();
            assert_eq!(out.store.len(), 1, "{from}-{to}");
        }
    }

    #[test]
    fn mismatched_sides_fail() {
        for (from, to) in [("N", "N"), ("S", "E"), ("E", "E"), ("W", "S")] {
            let result = run(&format!("2,{from},0,5,{to},0\n"));
            assert!(matches!(result, Err(CompileError::Consistency { .. })), "{from}-{to}");
        }
    }

    #[test]
    fn rows_become_numbered_records() {
        let out = run("# comment\n2,North,-4,5,South,0\n5,E,3,9,W,0\n").unwrap();
        let first = out.store.get(&Identifier::Num(0)).unwrap();
        assert_eq!(first.get("side1"), Some(&Value::sym("N")));
        assert_eq!(first.get("pos1"), Some(&Value::Int(-4)));
        assert_eq!(first.line, Some(2));
        assert_eq!(out.store.get(&Identifier::Num(1)).unwrap().u64("map2"), Some(9));
    }

    #[test]
    fn numeric_sides_skip_pairing() {
        let out = run("2,12,0,5,S,0\n").unwrap();
        let row = out.store.get(&Identifier::Num(0)).unwrap();
        assert_eq!(row.get("side1"), Some(&Value::Int(12)));
    }

    #[test]
    fn unknown_maps_warn_when_maps_are_listed() {
        let mut catalog = Catalog::default();
        catalog.map_names.insert(2, "Lappet Town".into());
        let out = run_with(catalog, "2,N,0,5,S,0\n").unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].kind, WarningKind::MissingAsset);
        assert_eq!(out.warnings[0].location.line, Some(1));

        assert!(run("2,N,0,5,S,0\n").unwrap().warnings.is_empty());
    }
}
