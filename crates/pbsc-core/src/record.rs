use crate::id::Identifier;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One compiled record: an identifier plus decoded fields keyed by their
/// canonical field id.
///
/// A field that is absent was never written in the section. A field that is
/// present but `Nil` was written and decoded to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Identifier,
    /// Line of the section header the record came from.
    pub line: Option<usize>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            line: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// The raw field, `Nil` included.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The field if present and not `Nil`.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_nil())
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Absent or `Nil`.
    pub fn is_unset(&self, field: &str) -> bool {
        self.value(field).is_none()
    }

    /// Absent, `Nil`, or an empty collection.
    pub fn is_unset_or_empty(&self, field: &str) -> bool {
        self.fields.get(field).is_none_or(Value::is_empty)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The elements of a list field; empty when absent or not a list.
    pub fn list(&self, field: &str) -> &[Value] {
        self.fields
            .get(field)
            .and_then(Value::as_list)
            .unwrap_or_default()
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.value(field).and_then(Value::as_str)
    }

    pub fn u64(&self, field: &str) -> Option<u64> {
        self.value(field).and_then(Value::as_u64)
    }
}
