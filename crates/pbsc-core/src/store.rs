//! Record stores: the mutable [`DataStore`] a dataset compiles into and the
//! read-only [`FrozenStore`] later datasets resolve against.

use crate::id::Identifier;
use crate::record::Record;
use crate::symbols::SymbolTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mutable, insertion-ordered record set of one dataset.
///
/// Two-stage lifecycle: records are inserted and rewritten while the
/// dataset compiles, then [`DataStore::freeze`] produces a read-only
/// [`FrozenStore`] that can be shared and persisted.
#[derive(Debug, Clone)]
pub struct DataStore {
    dataset: String,
    records: Vec<Record>,
    index: HashMap<Identifier, usize>,
}

impl DataStore {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Add a record. Fails if its identifier is already taken.
    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        if self.index.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, id: &Identifier) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: &Identifier) -> Option<&mut Record> {
        self.index.get(id).map(|&i| &mut self.records[i])
    }

    pub fn exists(&self, id: &Identifier) -> bool {
        self.index.contains_key(id)
    }

    /// Records in insertion order.
    pub fn each(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Records in insertion order, mutably. Identifiers must not change.
    pub fn each_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.iter_mut()
    }

    /// Snapshot of all identifiers in insertion order.
    pub fn ids(&self) -> Vec<Identifier> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Apply `f` to the record with the given identifier.
    pub fn mutate<F>(&mut self, id: &Identifier, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Record),
    {
        let record = self
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        f(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    pub fn freeze(self) -> FrozenStore {
        FrozenStore {
            dataset: self.dataset,
            records: self.records,
            index: self.index,
        }
    }
}

/// Read-only record set produced by [`DataStore::freeze`]. Thread-safe to
/// share.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoreData", into = "StoreData")]
pub struct FrozenStore {
    dataset: String,
    records: Vec<Record>,
    index: HashMap<Identifier, usize>,
}

impl FrozenStore {
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn get(&self, id: &Identifier) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn exists(&self, id: &Identifier) -> bool {
        self.index.contains_key(id)
    }

    pub fn each(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A mutable copy, for datasets that extend this one.
    pub fn to_store(&self) -> DataStore {
        DataStore {
            dataset: self.dataset.clone(),
            records: self.records.clone(),
            index: self.index.clone(),
        }
    }
}

impl PartialEq for FrozenStore {
    fn eq(&self, other: &Self) -> bool {
        self.dataset == other.dataset && self.records == other.records
    }
}

/// Record identifiers form the namespace named after the dataset.
impl SymbolTable for FrozenStore {
    fn resolve(&self, namespace: &str, token: &str) -> Option<String> {
        if namespace != self.dataset {
            return None;
        }
        let found = self.exists(&Identifier::from(token))
            || token
                .parse::<u64>()
                .is_ok_and(|n| self.exists(&Identifier::Num(n)));
        found.then(|| token.to_string())
    }

    fn has_namespace(&self, namespace: &str) -> bool {
        namespace == self.dataset
    }
}

/// Serialized form of a store; the index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct StoreData {
    dataset: String,
    records: Vec<Record>,
}

impl From<StoreData> for FrozenStore {
    fn from(data: StoreData) -> Self {
        let index = data
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        Self {
            dataset: data.dataset,
            records: data.records,
            index,
        }
    }
}

impl From<FrozenStore> for StoreData {
    fn from(store: FrozenStore) -> Self {
        Self {
            dataset: store.dataset,
            records: store.records,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("identifier '{0}' is already defined")]
    Duplicate(Identifier),
    #[error("identifier '{0}' not found")]
    NotFound(Identifier),
}
