use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a record within its dataset. Composite keys (trainer =
/// type + name + version) are `Compound`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Num(u64),
    Sym(String),
    Compound(Vec<Identifier>),
}

impl Identifier {
    /// Convert a decoded section name into an identifier.
    ///
    /// Returns `None` for values that cannot name a record (`Nil`, floats,
    /// negative integers, maps).
    pub fn from_value(value: &Value) -> Option<Identifier> {
        match value {
            Value::UInt(v) => Some(Identifier::Num(*v)),
            Value::Int(v) if *v >= 0 => Some(Identifier::Num(*v as u64)),
            Value::Str(s) | Value::Sym(s) => Some(Identifier::Sym(s.clone())),
            Value::List(items) => items
                .iter()
                .filter(|v| !v.is_nil())
                .map(Identifier::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Identifier::Compound),
            _ => None,
        }
    }

    /// The `BASE_n` identifier of a numbered variant of `base`.
    pub fn variant(base: &str, n: u64) -> Identifier {
        Identifier::Sym(format!("{base}_{n}"))
    }

    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Identifier::Sym(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<u64> {
        match self {
            Identifier::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Num(n) => write!(f, "{n}"),
            Identifier::Sym(s) => f.write_str(s),
            Identifier::Compound(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<u64> for Identifier {
    fn from(n: u64) -> Self {
        Identifier::Num(n)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Sym(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier::Sym(s)
    }
}
