//! Field-type grammar and per-dataset schemas.
//!
//! A schema is an ordered list of [`FieldDescriptor`]s, each mapping a
//! textual key (as written in the data file) to a canonical field id and a
//! [`TypeSpec`]. Type specs are written in the compact one-character
//! grammar used by the data files' documentation:
//!
//! | char | slot |
//! |------|------|
//! | `u` | unsigned integer |
//! | `v` | positive integer |
//! | `i` | signed integer |
//! | `x` | hexadecimal integer |
//! | `f` | float |
//! | `b` | boolean |
//! | `s` | string |
//! | `q` | unformatted string (rest of the value, commas included) |
//! | `n` | name (`[A-Za-z_][A-Za-z0-9_]*`) |
//! | `m` | symbol (any token) |
//! | `e` | enum reference |
//! | `y` | enum reference or integer |
//!
//! An uppercase letter makes the slot optional. A leading `*` repeats the
//! slot sequence over every remaining comma-separated token; a leading `^`
//! makes the key repeatable, one list element per occurrence.

use crate::error::CompileError;
use crate::value::Value;
use std::collections::HashMap;

/// Name of an enum namespace (a dataset kind or a catalog table).
pub type Namespace = &'static str;

/// The key whose value is the section's own header.
pub const SECTION_NAME: &str = "SectionName";

// ---------------------------------------------------------------------------
// Type grammar
// ---------------------------------------------------------------------------

/// The type of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    UInt,
    PosInt,
    Int,
    Hex,
    Float,
    Bool,
    Str,
    Text,
    Name,
    Symbol,
    Enum(Namespace),
    EnumOrInt(Namespace),
}

impl Scalar {
    /// Human-readable description used in grammar errors.
    pub fn describe(&self) -> &'static str {
        match self {
            Scalar::UInt => "an unsigned integer",
            Scalar::PosInt => "a positive integer",
            Scalar::Int => "an integer",
            Scalar::Hex => "a hexadecimal number",
            Scalar::Float => "a number",
            Scalar::Bool => "a boolean",
            Scalar::Str | Scalar::Text => "a string",
            Scalar::Name => "a name",
            Scalar::Symbol => "a symbol",
            Scalar::Enum(_) => "a defined name",
            Scalar::EnumOrInt(_) => "a defined name or an integer",
        }
    }

    pub fn namespace(&self) -> Option<Namespace> {
        match *self {
            Scalar::Enum(ns) | Scalar::EnumOrInt(ns) => Some(ns),
            _ => None,
        }
    }
}

/// One position in a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub scalar: Scalar,
    pub optional: bool,
}

/// The decoded shape of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// A single slot, decoded to a bare value.
    Single(Slot),
    /// A fixed-arity tuple, decoded to a list with `Nil` for omitted slots.
    Tuple(Vec<Slot>),
    /// `*`: the slot sequence repeats over every remaining token.
    Repeat(Vec<Slot>),
    /// `^`: one element per occurrence of the key.
    Lines(Box<TypeSpec>),
}

impl TypeSpec {
    /// Parse a grammar string. `namespaces` supplies, in order, the
    /// namespace of every `e`/`y` slot.
    pub fn parse(grammar: &str, namespaces: &[Namespace]) -> Result<TypeSpec, String> {
        let mut rest = grammar;
        let mut lines = false;
        if let Some(stripped) = rest.strip_prefix('^') {
            lines = true;
            rest = stripped;
        }
        let mut repeat = false;
        if let Some(stripped) = rest.strip_prefix('*') {
            repeat = true;
            rest = stripped;
        }
        if rest.is_empty() {
            return Err(format!("grammar '{grammar}' has no slots"));
        }

        let mut namespaces = namespaces.iter();
        let mut slots = Vec::with_capacity(rest.len());
        for c in rest.chars() {
            let optional = c.is_ascii_uppercase();
            let scalar = match c.to_ascii_lowercase() {
                'u' => Scalar::UInt,
                'v' => Scalar::PosInt,
                'i' => Scalar::Int,
                'x' => Scalar::Hex,
                'f' => Scalar::Float,
                'b' => Scalar::Bool,
                's' => Scalar::Str,
                'q' => Scalar::Text,
                'n' => Scalar::Name,
                'm' => Scalar::Symbol,
                'e' | 'y' => {
                    let ns = namespaces
                        .next()
                        .ok_or_else(|| format!("grammar '{grammar}' needs a namespace for '{c}'"))?;
                    if c.eq_ignore_ascii_case(&'e') {
                        Scalar::Enum(ns)
                    } else {
                        Scalar::EnumOrInt(ns)
                    }
                }
                _ => return Err(format!("unknown grammar character '{c}' in '{grammar}'")),
            };
            slots.push(Slot { scalar, optional });
        }
        if namespaces.next().is_some() {
            return Err(format!("grammar '{grammar}' was given unused namespaces"));
        }
        if let Some(pos) = slots.iter().position(|s| s.scalar == Scalar::Text) {
            if pos + 1 != slots.len() {
                return Err(format!("'q' must be the last slot in '{grammar}'"));
            }
            if repeat {
                return Err(format!("'q' cannot repeat in '{grammar}'"));
            }
        }

        let spec = if repeat {
            TypeSpec::Repeat(slots)
        } else if slots.len() == 1 {
            TypeSpec::Single(slots[0])
        } else {
            TypeSpec::Tuple(slots)
        };
        Ok(if lines {
            TypeSpec::Lines(Box::new(spec))
        } else {
            spec
        })
    }

    /// Whether the key may occur more than once in a section.
    pub fn is_repeatable(&self) -> bool {
        matches!(self, TypeSpec::Lines(_))
    }

    /// The slots of this spec (of the element spec for `Lines`).
    pub fn slots(&self) -> &[Slot] {
        match self {
            TypeSpec::Single(slot) => std::slice::from_ref(slot),
            TypeSpec::Tuple(slots) | TypeSpec::Repeat(slots) => slots,
            TypeSpec::Lines(inner) => inner.slots(),
        }
    }

    /// Collect every symbol this spec placed in `value` from slots that
    /// reference `namespace`.
    pub fn collect_refs<'v>(&self, value: &'v Value, namespace: &str, out: &mut Vec<&'v str>) {
        let push_slot = |slot: &Slot, v: &'v Value, out: &mut Vec<&'v str>| {
            if slot.scalar.namespace() == Some(namespace) {
                if let Value::Sym(s) = v {
                    out.push(s);
                }
            }
        };
        match self {
            TypeSpec::Single(slot) => push_slot(slot, value, out),
            TypeSpec::Tuple(slots) => {
                for (i, slot) in slots.iter().enumerate() {
                    push_slot(slot, value.at(i), out);
                }
            }
            TypeSpec::Repeat(slots) => {
                for item in value.as_list().unwrap_or_default() {
                    if slots.len() == 1 {
                        push_slot(&slots[0], item, out);
                    } else {
                        for (i, slot) in slots.iter().enumerate() {
                            push_slot(slot, item.at(i), out);
                        }
                    }
                }
            }
            TypeSpec::Lines(inner) => {
                for item in value.as_list().unwrap_or_default() {
                    inner.collect_refs(item, namespace, out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Field descriptors
// ---------------------------------------------------------------------------

/// One schema entry.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Key as written in the data file.
    pub key: &'static str,
    /// Canonical field id in the compiled record.
    pub id: &'static str,
    pub spec: TypeSpec,
    /// Values for omitted trailing tuple slots, by slot index.
    pub defaults: Vec<Value>,
    /// Inclusive bound every integer in the value must respect.
    pub bounds: Option<(i64, i64)>,
}

impl FieldDescriptor {
    pub fn is_section_name(&self) -> bool {
        self.key == SECTION_NAME
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The ordered key → field mapping of one dataset kind.
#[derive(Debug, Clone)]
pub struct Schema {
    dataset: &'static str,
    fields: Vec<FieldDescriptor>,
    by_key: HashMap<&'static str, usize>,
}

impl Schema {
    pub fn builder(dataset: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            dataset,
            fields: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn dataset(&self) -> &'static str {
        self.dataset
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    pub fn field_by_id(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn section_name(&self) -> Option<&FieldDescriptor> {
        self.field(SECTION_NAME)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for a [`Schema`]. Grammar errors are collected and reported by
/// [`SchemaBuilder::build`].
#[derive(Debug)]
pub struct SchemaBuilder {
    dataset: &'static str,
    fields: Vec<FieldDescriptor>,
    errors: Vec<String>,
}

impl SchemaBuilder {
    /// Add a field whose grammar has no enum slots.
    pub fn field(self, key: &'static str, id: &'static str, grammar: &str) -> Self {
        self.enum_field(key, id, grammar, &[])
    }

    /// Add a field whose `e`/`y` slots resolve against `namespaces`.
    pub fn enum_field(
        mut self,
        key: &'static str,
        id: &'static str,
        grammar: &str,
        namespaces: &[Namespace],
    ) -> Self {
        match TypeSpec::parse(grammar, namespaces) {
            Ok(spec) => self.fields.push(FieldDescriptor {
                key,
                id,
                spec,
                defaults: Vec::new(),
                bounds: None,
            }),
            Err(e) => self.errors.push(format!("{key}: {e}")),
        }
        self
    }

    /// Trailing-slot defaults for the most recently added field.
    pub fn defaults(mut self, defaults: Vec<Value>) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.defaults = defaults;
        }
        self
    }

    /// Inclusive integer bound for the most recently added field.
    pub fn bounded(mut self, min: i64, max: i64) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.bounds = Some((min, max));
        }
        self
    }

    pub fn build(self) -> Result<Schema, CompileError> {
        let mut errors = self.errors;
        let mut by_key = HashMap::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            if by_key.insert(field.key, i).is_some() {
                errors.push(format!("key '{}' is declared twice", field.key));
            }
            if self.fields[..i].iter().any(|f| f.id == field.id) {
                errors.push(format!("field id '{}' is declared twice", field.id));
            }
        }
        if !errors.is_empty() {
            return Err(CompileError::schema(self.dataset, errors.join("; ")));
        }
        Ok(Schema {
            dataset: self.dataset,
            fields: self.fields,
            by_key,
        })
    }
}
