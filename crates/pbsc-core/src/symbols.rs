//! Name resolution for enum slots.

use std::collections::HashMap;

/// Resolves a token written in a data file to the canonical member of a
/// namespace.
///
/// Implemented by the built-in catalog, by frozen stores (their record ids
/// form a namespace) and by [`Layered`] to combine several tables.
pub trait SymbolTable: Sync {
    /// The canonical name `token` denotes in `namespace`, or `None`.
    fn resolve(&self, namespace: &str, token: &str) -> Option<String>;

    /// Whether this table knows `namespace` at all.
    fn has_namespace(&self, namespace: &str) -> bool;
}

/// A table that resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolTable for NoSymbols {
    fn resolve(&self, _namespace: &str, _token: &str) -> Option<String> {
        None
    }

    fn has_namespace(&self, _namespace: &str) -> bool {
        false
    }
}

/// An in-memory namespace → alias → canonical map.
///
/// Aliases are matched exactly. Every canonical name is also an alias of
/// itself.
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    namespaces: HashMap<String, HashMap<String, String>>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `names` as canonical members of `namespace`.
    pub fn with(mut self, namespace: &str, names: &[&str]) -> Self {
        for name in names {
            self.insert(namespace, name, name);
        }
        self
    }

    pub fn insert(&mut self, namespace: &str, alias: &str, canonical: &str) {
        let ns = self.namespaces.entry(namespace.to_string()).or_default();
        ns.insert(canonical.to_string(), canonical.to_string());
        ns.insert(alias.to_string(), canonical.to_string());
    }

    /// Declare an empty namespace.
    pub fn declare(&mut self, namespace: &str) {
        self.namespaces.entry(namespace.to_string()).or_default();
    }
}

impl SymbolTable for SymbolMap {
    fn resolve(&self, namespace: &str, token: &str) -> Option<String> {
        self.namespaces.get(namespace)?.get(token).cloned()
    }

    fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }
}

/// Searches its tables in order; the first table that knows the namespace
/// answers.
pub struct Layered<'a> {
    tables: Vec<&'a dyn SymbolTable>,
}

impl<'a> Layered<'a> {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn push(&mut self, table: &'a dyn SymbolTable) {
        self.tables.push(table);
    }
}

impl Default for Layered<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable for Layered<'_> {
    fn resolve(&self, namespace: &str, token: &str) -> Option<String> {
        self.tables
            .iter()
            .find(|t| t.has_namespace(namespace))
            .and_then(|t| t.resolve(namespace, token))
    }

    fn has_namespace(&self, namespace: &str) -> bool {
        self.tables.iter().any(|t| t.has_namespace(namespace))
    }
}
