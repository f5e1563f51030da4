//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::compiler::{CompileEnv, Compiled, Dataset, compile};
use crate::error::CompileError;
use crate::schema::{Namespace, SECTION_NAME, Schema};
use crate::store::DataStore;
use crate::symbols::{SymbolMap, SymbolTable};

// ===========================================================================
// Datasets
// ===========================================================================

/// A dataset with a schema and no validation hooks.
pub struct PlainDataset {
    pub namespace: Namespace,
    pub schema: Schema,
}

impl PlainDataset {
    pub fn new(namespace: Namespace, schema: Schema) -> Self {
        Self { namespace, schema }
    }
}

impl Dataset for PlainDataset {
    fn namespace(&self) -> Namespace {
        self.namespace
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A small type-chart dataset: names, a special flag and three
/// own-namespace reference lists.
pub fn type_dataset() -> PlainDataset {
    let schema = Schema::builder("Type")
        .field(SECTION_NAME, "id", "m")
        .field("Name", "real_name", "s")
        .field("IconPosition", "icon_position", "u")
        .field("IsSpecialType", "special_type", "b")
        .enum_field("Weaknesses", "weaknesses", "*e", &["Type"])
        .enum_field("Resistances", "resistances", "*e", &["Type"])
        .enum_field("Immunities", "immunities", "*e", &["Type"])
        .field("Flags", "flags", "*s")
        .build()
        .expect("type schema is valid");
    PlainDataset::new("Type", schema)
}

// ===========================================================================
// Symbols
// ===========================================================================

pub fn symbols() -> SymbolMap {
    SymbolMap::new()
        .with("Type", &["NORMAL", "FIRE", "WATER", "GRASS", "ELECTRIC"])
        .with("Move", &["TACKLE", "GROWL", "EMBER", "WATERGUN"])
        .with("Stat", &["HP", "ATTACK", "DEFENSE", "SPECIAL_ATTACK", "SPECIAL_DEFENSE", "SPEED"])
}

// ===========================================================================
// Compiling
// ===========================================================================

/// Compile `text` into a fresh store.
pub fn compile_str<D: Dataset + ?Sized>(
    dataset: &D,
    file: &str,
    text: &str,
    symbols: &dyn SymbolTable,
) -> Result<Compiled, CompileError> {
    compile(
        dataset,
        text,
        DataStore::new(dataset.namespace()),
        CompileEnv::new(file, symbols),
    )
}

/// A type chart with `count` types, each weak to the next one.
pub fn type_chart_text(count: usize) -> String {
    let mut text = String::new();
    for i in 0..count {
        let next = (i + 1) % count;
        text.push_str(&format!(
            "# ------\n[TYPE{i}]\nName = Type {i}\nIconPosition = {i}\nWeaknesses = TYPE{next}\nFlags = A,B\n"
        ));
    }
    text
}
