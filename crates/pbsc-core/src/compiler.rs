//! The two-phase dataset pipeline.
//!
//! Phase 1 turns each section into a [`Record`] (schema-driven decode, then
//! the dataset's `local_validate` hook, then a duplicate check and insert).
//! Phase 2 runs once over the whole store: forward references into the
//! dataset's own namespace are checked, then the dataset's
//! `global_validate` hook derives relations and collects messages.
//!
//! A dataset that fails either phase produces nothing: [`compile`] returns
//! the error and the partially built store is dropped.

use crate::codec::{DecodeContext, decode, decode_field};
use crate::error::{CompileError, Location, Warning, WarningKind};
use crate::id::Identifier;
use crate::messages::Messages;
use crate::reader::{BodyLine, RawValue, Section, SectionReader};
use crate::record::Record;
use crate::schema::{FieldDescriptor, Namespace, Schema, TypeSpec};
use crate::store::{DataStore, FrozenStore};
use crate::symbols::SymbolTable;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do with a key the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownKeyPolicy {
    /// Fail with a grammar error.
    #[default]
    Reject,
    /// Skip the key.
    Ignore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub unknown_keys: UnknownKeyPolicy,
}

// ---------------------------------------------------------------------------
// Store lookup
// ---------------------------------------------------------------------------

/// Access to the frozen stores of datasets compiled earlier.
pub trait StoreLookup: Sync {
    fn store(&self, namespace: &str) -> Option<&FrozenStore>;
}

/// No earlier datasets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStores;

impl StoreLookup for NoStores {
    fn store(&self, _namespace: &str) -> Option<&FrozenStore> {
        None
    }
}

impl StoreLookup for HashMap<String, FrozenStore> {
    fn store(&self, namespace: &str) -> Option<&FrozenStore> {
        self.get(namespace)
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// One kind of dataset: a schema plus its validation hooks.
pub trait Dataset: Send + Sync {
    /// Enum namespace formed by this dataset's record ids.
    fn namespace(&self) -> Namespace;

    /// Name used in logs and errors; defaults to the namespace.
    fn name(&self) -> &'static str {
        self.namespace()
    }

    fn schema(&self) -> &Schema;

    /// Whether this dataset compiles `section`. Lets two datasets share a
    /// file.
    fn accepts(&self, _section: &Section) -> bool {
        true
    }

    /// Phase 1 over the whole file. The default reads `[section]` blocks of
    /// `key = value` entries; table-style datasets override it.
    fn compile_records(
        &self,
        text: &str,
        store: &mut DataStore,
        cx: &mut HookContext<'_>,
    ) -> Result<(), CompileError> {
        compile_text(self, text, store, cx)
    }

    /// Per-record validation and normalisation, before the duplicate check.
    fn local_validate(&self, _record: &mut Record, _cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        Ok(())
    }

    /// Whole-store validation after every record is in.
    fn global_validate(&self, _store: &mut DataStore, _cx: &mut HookContext<'_>) -> Result<(), CompileError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hook context
// ---------------------------------------------------------------------------

/// Inputs of one compile run.
pub struct CompileEnv<'a> {
    pub file: &'a str,
    pub symbols: &'a dyn SymbolTable,
    pub stores: &'a dyn StoreLookup,
    pub options: CompileOptions,
    /// Starting message tables (usually a [`Messages::fork`]).
    pub messages: Messages,
}

impl<'a> CompileEnv<'a> {
    pub fn new(file: &'a str, symbols: &'a dyn SymbolTable) -> Self {
        Self {
            file,
            symbols,
            stores: &NoStores,
            options: CompileOptions::default(),
            messages: Messages::new(),
        }
    }

    pub fn with_stores(mut self, stores: &'a dyn StoreLookup) -> Self {
        self.stores = stores;
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }
}

/// State shared with validation hooks: the current location for error
/// reporting, collected warnings, and message tables.
pub struct HookContext<'a> {
    file: &'a str,
    namespace: Namespace,
    symbols: &'a dyn SymbolTable,
    stores: &'a dyn StoreLookup,
    options: CompileOptions,
    location: Location,
    warnings: Vec<Warning>,
    pub messages: Messages,
}

impl<'a> HookContext<'a> {
    pub fn new(env: CompileEnv<'a>, namespace: Namespace) -> Self {
        Self {
            file: env.file,
            namespace,
            symbols: env.symbols,
            stores: env.stores,
            options: env.options,
            location: Location::file(env.file),
            warnings: Vec::new(),
            messages: env.messages,
        }
    }

    pub fn file(&self) -> &'a str {
        self.file
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn symbols(&self) -> &'a dyn SymbolTable {
        self.symbols
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Frozen store of an earlier dataset.
    pub fn store(&self, namespace: &str) -> Option<&'a FrozenStore> {
        self.stores.store(namespace)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Point the location at a section header.
    pub fn at_section(&mut self, name: impl Into<String>, line: usize) {
        self.location = Location::file(self.file).with_section(name).at_line(line);
    }

    /// Point the location at a record (phase 2).
    pub fn at_record(&mut self, record: &Record) {
        let mut location = Location::file(self.file).with_section(record.id.to_string());
        location.line = record.line;
        self.location = location;
    }

    /// Point the location at a line of a table-style file.
    pub fn at_line(&mut self, line: usize) {
        self.location.line = Some(line);
    }

    pub fn at_field(&mut self, field: impl Into<String>) {
        self.location.field = Some(field.into());
    }

    /// Record a non-fatal diagnostic at the current location.
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let warning = Warning {
            kind,
            message: message.into(),
            location: self.location.clone(),
        };
        tracing::warn!(file = self.file, "{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Decode `raw` at the current location. Own-namespace enum slots are
    /// kept as forward references.
    pub fn decode(&self, raw: &str, spec: &TypeSpec) -> Result<Value, CompileError> {
        decode(raw, spec, &self.decode_context(&self.location))
    }

    /// Decode `raw` at the current location, resolving own-namespace enum
    /// slots against `store` instead of deferring them.
    pub fn decode_against(
        &self,
        raw: &str,
        spec: &TypeSpec,
        store: &DataStore,
    ) -> Result<Value, CompileError> {
        let value = self.decode(raw, spec)?;
        let mut refs = Vec::new();
        spec.collect_refs(&value, self.namespace, &mut refs);
        for token in refs {
            if !store.exists(&Identifier::from(token)) {
                return Err(self.reference(self.namespace, token));
            }
        }
        Ok(value)
    }

    /// Decode one occurrence of `field` at `line`, applying its defaults and
    /// bounds.
    pub fn decode_entry(
        &self,
        text: &str,
        line: usize,
        field: &FieldDescriptor,
    ) -> Result<Value, CompileError> {
        let location = self.location.clone().with_field(field.key).at_line(line);
        let raw = RawValue::single(text, line);
        decode_field(&raw, field, &self.decode_context(&location))
    }

    fn decode_context<'l>(&self, location: &'l Location) -> DecodeContext<'l>
    where
        'a: 'l,
    {
        DecodeContext::new(self.symbols, location).own_namespace(self.namespace)
    }

    pub fn grammar(&self, message: impl Into<String>) -> CompileError {
        CompileError::grammar(&self.location, message)
    }

    pub fn range(&self, message: impl Into<String>) -> CompileError {
        CompileError::range(&self.location, message)
    }

    pub fn consistency(&self, message: impl Into<String>) -> CompileError {
        CompileError::consistency(&self.location, message)
    }

    pub fn reference(&self, namespace: &str, value: impl Into<String>) -> CompileError {
        CompileError::reference(&self.location, namespace, value)
    }

    pub fn duplicate(&self, id: &Identifier) -> CompileError {
        CompileError::duplicate(&self.location, id)
    }

    fn into_parts(self) -> (Vec<Warning>, Messages) {
        (self.warnings, self.messages)
    }
}

// ---------------------------------------------------------------------------
// Phase 1
// ---------------------------------------------------------------------------

/// Compile one section into a record, running `local_validate`.
pub fn compile_section<D: Dataset + ?Sized>(
    dataset: &D,
    section: &Section,
    cx: &mut HookContext<'_>,
) -> Result<Record, CompileError> {
    let schema = dataset.schema();
    cx.at_section(&section.name, section.line);

    if let Some(BodyLine::Row(row)) = section.body.iter().find(|l| matches!(l, BodyLine::Row(_))) {
        cx.at_line(row.line);
        return Err(cx.grammar(format!("expected \"key = value\", got \"{}\"", row.text)));
    }

    let entries = section.entries();
    for (key, raw) in &entries {
        if schema.field(key).is_some() {
            continue;
        }
        match cx.options.unknown_keys {
            UnknownKeyPolicy::Reject => {
                let location = cx.location.clone().with_field(*key).at_line(raw.line());
                return Err(CompileError::grammar(
                    &location,
                    format!("unknown key '{key}' for {}", dataset.name()),
                ));
            }
            UnknownKeyPolicy::Ignore => {
                tracing::trace!(dataset = dataset.name(), key, line = raw.line(), "ignoring unknown key");
            }
        }
    }

    let mut record = Record::new(section.name.as_str()).at_line(section.line);
    if let Some(field) = schema.section_name() {
        let location = cx.location.clone().with_field(field.key);
        let raw = RawValue::single(section.name.as_str(), section.line);
        let value = decode_field(&raw, field, &cx.decode_context(&location))?;
        record.id = Identifier::from_value(&value).ok_or_else(|| {
            CompileError::grammar(
                &location,
                format!("section name \"{}\" is not a valid identifier", section.name),
            )
        })?;
    }

    for field in schema.fields().filter(|f| !f.is_section_name()) {
        let Some((_, raw)) = entries.iter().find(|(k, _)| *k == field.key) else {
            continue;
        };
        let location = cx.location.clone().with_field(field.key);
        let value = decode_field(raw, field, &cx.decode_context(&location))?;
        record.set(field.id, value);
    }

    dataset.local_validate(&mut record, cx)?;
    Ok(record)
}

/// Insert a finished record, naming the section on a duplicate.
pub fn insert_record(
    store: &mut DataStore,
    record: Record,
    cx: &HookContext<'_>,
) -> Result<(), CompileError> {
    if store.exists(&record.id) {
        return Err(cx.duplicate(&record.id));
    }
    store
        .insert(record)
        .map_err(|e| cx.consistency(e.to_string()))
}

/// The default phase 1: every accepted section through [`compile_section`].
pub fn compile_text<D: Dataset + ?Sized>(
    dataset: &D,
    text: &str,
    store: &mut DataStore,
    cx: &mut HookContext<'_>,
) -> Result<(), CompileError> {
    for section in SectionReader::new(cx.file, text) {
        let section = section?;
        if !dataset.accepts(&section) {
            continue;
        }
        let record = compile_section(dataset, &section, cx)?;
        insert_record(store, record, cx)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 2
// ---------------------------------------------------------------------------

/// Check every forward reference the codec deferred: each symbol written in
/// an own-namespace enum slot must name a record of the store.
pub fn resolve_forward_references(
    schema: &Schema,
    namespace: &str,
    store: &DataStore,
    cx: &mut HookContext<'_>,
) -> Result<(), CompileError> {
    let fields: Vec<_> = schema
        .fields()
        .filter(|f| !f.is_section_name())
        .filter(|f| f.spec.slots().iter().any(|s| s.scalar.namespace() == Some(namespace)))
        .collect();
    if fields.is_empty() {
        return Ok(());
    }
    for record in store.each() {
        for field in &fields {
            let Some(value) = record.value(field.id) else {
                continue;
            };
            let mut refs = Vec::new();
            field.spec.collect_refs(value, namespace, &mut refs);
            if let Some(missing) = refs.into_iter().find(|r| !store.exists(&Identifier::from(*r))) {
                cx.at_record(record);
                cx.at_field(field.key);
                return Err(cx.reference(namespace, missing));
            }
        }
    }
    Ok(())
}

/// Phase 2 for a dataset whose records are all in `store`.
pub fn finalize<D: Dataset + ?Sized>(
    dataset: &D,
    store: &mut DataStore,
    cx: &mut HookContext<'_>,
) -> Result<(), CompileError> {
    resolve_forward_references(dataset.schema(), dataset.namespace(), store, cx)?;
    cx.set_location(Location::file(cx.file));
    dataset.global_validate(store, cx)
}

/// Result of a successful compile.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub store: FrozenStore,
    pub warnings: Vec<Warning>,
    pub messages: Messages,
}

/// Run both phases of `dataset` over `text`, extending `store`.
pub fn compile<D: Dataset + ?Sized>(
    dataset: &D,
    text: &str,
    store: DataStore,
    env: CompileEnv<'_>,
) -> Result<Compiled, CompileError> {
    tracing::debug!(dataset = dataset.name(), file = env.file, "compiling");
    let mut store = store;
    let mut cx = HookContext::new(env, dataset.namespace());
    dataset.compile_records(text, &mut store, &mut cx)?;
    finalize(dataset, &mut store, &mut cx)?;
    let (warnings, messages) = cx.into_parts();
    tracing::debug!(
        dataset = dataset.name(),
        records = store.len(),
        warnings = warnings.len(),
        "compiled"
    );
    Ok(Compiled {
        store: store.freeze(),
        warnings,
        messages,
    })
}
