//! Field codec: raw value text + [`TypeSpec`] → [`Value`].
//!
//! Decoding is pure. Enum slots consult the [`SymbolTable`] in the
//! [`DecodeContext`]; a slot naming the compiling dataset's own namespace is
//! a forward reference and keeps the raw token for phase 2 to check.

use crate::error::{CompileError, Location};
use crate::reader::RawValue;
use crate::schema::{FieldDescriptor, Scalar, Slot, TypeSpec};
use crate::symbols::SymbolTable;
use crate::value::Value;
use std::num::IntErrorKind;

/// Everything the codec needs besides the text itself.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub symbols: &'a dyn SymbolTable,
    /// Namespace of the dataset being compiled.
    pub own_namespace: Option<&'a str>,
    pub location: &'a Location,
}

impl<'a> DecodeContext<'a> {
    pub fn new(symbols: &'a dyn SymbolTable, location: &'a Location) -> Self {
        Self {
            symbols,
            own_namespace: None,
            location,
        }
    }

    pub fn own_namespace(mut self, namespace: &'a str) -> Self {
        self.own_namespace = Some(namespace);
        self
    }

    fn grammar(&self, message: impl Into<String>) -> CompileError {
        CompileError::grammar(self.location, message)
    }

    fn range(&self, message: impl Into<String>) -> CompileError {
        CompileError::range(self.location, message)
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Decode one raw value against a type spec.
///
/// For a `Lines` spec this decodes a single occurrence; use
/// [`decode_field`] to decode every occurrence of a key.
pub fn decode(raw: &str, spec: &TypeSpec, cx: &DecodeContext<'_>) -> Result<Value, CompileError> {
    decode_spec(raw, spec, &[], cx)
}

/// Decode every occurrence of a key against its field descriptor: applies
/// tuple defaults and bounds, and rejects recurrence of a non-repeatable
/// key. Values that decode to an empty list become `Nil`.
pub fn decode_field(
    raw: &RawValue,
    field: &FieldDescriptor,
    cx: &DecodeContext<'_>,
) -> Result<Value, CompileError> {
    let value = match &field.spec {
        TypeSpec::Lines(inner) => {
            let mut items = Vec::with_capacity(raw.occurrences().len());
            for occurrence in raw.occurrences() {
                let location = cx.location.clone().at_line(occurrence.line);
                let line_cx = DecodeContext {
                    location: &location,
                    ..*cx
                };
                let value = decode_spec(&occurrence.text, inner, &field.defaults, &line_cx)?;
                check_bounds(&value, field, &line_cx)?;
                if !value.is_empty() {
                    items.push(value);
                }
            }
            Value::List(items)
        }
        spec => {
            if raw.is_repeated() {
                let location = cx.location.clone().at_line(raw.occurrences()[1].line);
                return Err(CompileError::grammar(
                    &location,
                    format!("key '{}' may only appear once per section", field.key),
                ));
            }
            let location = cx.location.clone().at_line(raw.line());
            let line_cx = DecodeContext {
                location: &location,
                ..*cx
            };
            let value = decode_spec(&raw.first().text, spec, &field.defaults, &line_cx)?;
            check_bounds(&value, field, &line_cx)?;
            value
        }
    };
    Ok(match value {
        Value::List(items) if items.is_empty() => Value::Nil,
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Comma-separated tokens of a raw value. Double-quoted tokens may contain
/// commas and the escapes `\"` and `\\`.
struct Tokens<'r> {
    rest: &'r str,
    done: bool,
}

impl<'r> Tokens<'r> {
    fn new(raw: &'r str) -> Self {
        Self {
            rest: raw,
            done: raw.trim().is_empty(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.done
    }

    /// Everything not yet consumed, verbatim apart from outer whitespace.
    fn take_rest(&mut self) -> &'r str {
        if self.done {
            return "";
        }
        self.done = true;
        self.rest.trim()
    }

    fn next_token(&mut self) -> Result<Option<String>, String> {
        if self.done {
            return Ok(None);
        }
        let s = self.rest.trim_start();
        if let Some(quoted) = s.strip_prefix('"') {
            let mut token = String::new();
            let mut chars = quoted.char_indices();
            let mut end = None;
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, escaped)) => token.push(escaped),
                        None => break,
                    },
                    '"' => {
                        end = Some(i + 1);
                        break;
                    }
                    _ => token.push(c),
                }
            }
            let end = end.ok_or_else(|| format!("unterminated quoted string in \"{s}\""))?;
            let after = quoted[end..].trim_start();
            if after.is_empty() {
                self.done = true;
            } else if let Some(next) = after.strip_prefix(',') {
                self.rest = next;
            } else {
                return Err(format!("unexpected text after closing quote: \"{after}\""));
            }
            return Ok(Some(token));
        }
        match s.find(',') {
            Some(i) => {
                self.rest = &s[i + 1..];
                Ok(Some(s[..i].trim().to_string()))
            }
            None => {
                self.done = true;
                Ok(Some(s.trim().to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Spec decoding
// ---------------------------------------------------------------------------

fn decode_spec(
    raw: &str,
    spec: &TypeSpec,
    defaults: &[Value],
    cx: &DecodeContext<'_>,
) -> Result<Value, CompileError> {
    let mut tokens = Tokens::new(raw);
    match spec {
        TypeSpec::Single(slot) => {
            let token = take(&mut tokens, slot, cx)?;
            ensure_consumed(&tokens, raw, cx)?;
            let value = decode_slot(token.as_deref(), slot, cx)?;
            Ok(match (value, defaults.first()) {
                (Value::Nil, Some(default)) => default.clone(),
                (value, _) => value,
            })
        }
        TypeSpec::Tuple(slots) => {
            let values = decode_group(&mut tokens, slots, cx)?;
            ensure_consumed(&tokens, raw, cx)?;
            Ok(finish_tuple(values, defaults))
        }
        TypeSpec::Repeat(slots) => {
            let mut items = Vec::new();
            while !tokens.is_exhausted() {
                let mut group = Vec::with_capacity(slots.len());
                for slot in slots {
                    group.push(take(&mut tokens, slot, cx)?);
                }
                if group.iter().all(|t| t.as_deref().is_none_or(str::is_empty)) {
                    continue;
                }
                let values = slots
                    .iter()
                    .zip(&group)
                    .map(|(slot, token)| decode_slot(token.as_deref(), slot, cx))
                    .collect::<Result<Vec<_>, _>>()?;
                if slots.len() == 1 {
                    items.extend(values.into_iter().filter(|v| !v.is_nil()));
                } else {
                    match finish_tuple(values, defaults) {
                        Value::Nil => {}
                        tuple => items.push(tuple),
                    }
                }
            }
            Ok(if items.is_empty() {
                Value::Nil
            } else {
                Value::List(items)
            })
        }
        TypeSpec::Lines(inner) => decode_spec(raw, inner, defaults, cx),
    }
}

fn take(
    tokens: &mut Tokens<'_>,
    slot: &Slot,
    cx: &DecodeContext<'_>,
) -> Result<Option<String>, CompileError> {
    if slot.scalar == Scalar::Text {
        let rest = tokens.take_rest();
        return Ok((!rest.is_empty()).then(|| rest.to_string()));
    }
    tokens.next_token().map_err(|e| cx.grammar(e))
}

fn decode_group(
    tokens: &mut Tokens<'_>,
    slots: &[Slot],
    cx: &DecodeContext<'_>,
) -> Result<Vec<Value>, CompileError> {
    let mut values = Vec::with_capacity(slots.len());
    for slot in slots {
        let token = take(tokens, slot, cx)?;
        values.push(decode_slot(token.as_deref(), slot, cx)?);
    }
    Ok(values)
}

fn ensure_consumed(tokens: &Tokens<'_>, raw: &str, cx: &DecodeContext<'_>) -> Result<(), CompileError> {
    if tokens.is_exhausted() {
        Ok(())
    } else {
        Err(cx.grammar(format!("too many values in \"{}\"", raw.trim())))
    }
}

/// All-`Nil` tuples collapse to `Nil`; otherwise omitted slots take their
/// declared defaults.
fn finish_tuple(mut values: Vec<Value>, defaults: &[Value]) -> Value {
    if values.iter().all(Value::is_nil) {
        return Value::Nil;
    }
    for (value, default) in values.iter_mut().zip(defaults) {
        if value.is_nil() && !default.is_nil() {
            *value = default.clone();
        }
    }
    Value::List(values)
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

fn decode_slot(token: Option<&str>, slot: &Slot, cx: &DecodeContext<'_>) -> Result<Value, CompileError> {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ if slot.optional => return Ok(Value::Nil),
        _ => {
            return match slot.scalar {
                Scalar::Str | Scalar::Text => Ok(Value::str("")),
                scalar => Err(cx.grammar(format!("expected {}, got nothing", scalar.describe()))),
            };
        }
    };
    match slot.scalar {
        Scalar::UInt => parse_uint(token, cx).map(Value::UInt),
        Scalar::PosInt => match parse_uint(token, cx)? {
            0 => Err(cx.range(format!("value {token} must be 1 or greater"))),
            n => Ok(Value::UInt(n)),
        },
        Scalar::Int => parse_int(token, cx).map(Value::Int),
        Scalar::Hex => {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u64::from_str_radix(digits, 16)
                .map(Value::UInt)
                .map_err(|_| cx.grammar(format!("expected a hexadecimal number, got \"{token}\"")))
        }
        Scalar::Float => match token.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(cx.grammar(format!("expected a number, got \"{token}\""))),
        },
        Scalar::Bool => parse_bool(token)
            .map(Value::Bool)
            .ok_or_else(|| cx.grammar(format!("expected a boolean, got \"{token}\""))),
        Scalar::Str | Scalar::Text => Ok(Value::str(token)),
        Scalar::Name => {
            if is_name(token) {
                Ok(Value::sym(token))
            } else {
                Err(cx.grammar(format!("expected a name, got \"{token}\"")))
            }
        }
        Scalar::Symbol => Ok(Value::sym(token)),
        Scalar::Enum(ns) => resolve_enum(token, ns, cx),
        Scalar::EnumOrInt(ns) => match token.parse::<i64>() {
            Ok(n) => Ok(Value::Int(n)),
            Err(_) => resolve_enum(token, ns, cx),
        },
    }
}

fn resolve_enum(token: &str, namespace: &str, cx: &DecodeContext<'_>) -> Result<Value, CompileError> {
    if cx.own_namespace == Some(namespace) {
        return Ok(Value::sym(token));
    }
    cx.symbols
        .resolve(namespace, token)
        .map(Value::Sym)
        .ok_or_else(|| CompileError::reference(cx.location, namespace, token))
}

fn parse_uint(token: &str, cx: &DecodeContext<'_>) -> Result<u64, CompileError> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    match digits.parse::<u64>() {
        Ok(n) => Ok(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
            Err(cx.range(format!("value {token} is too large")))
        }
        Err(_) => match token.parse::<i64>() {
            Ok(n) if n < 0 => Err(cx.range(format!("value {token} must be 0 or greater"))),
            _ => Err(cx.grammar(format!("expected an unsigned integer, got \"{token}\""))),
        },
    }
}

fn parse_int(token: &str, cx: &DecodeContext<'_>) -> Result<i64, CompileError> {
    token.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            cx.range(format!("value {token} is out of range"))
        }
        _ => cx.grammar(format!("expected an integer, got \"{token}\"")),
    })
}

pub(crate) fn parse_bool(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "t" | "1" => Some(true),
        "false" | "no" | "n" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn is_name(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_bounds(value: &Value, field: &FieldDescriptor, cx: &DecodeContext<'_>) -> Result<(), CompileError> {
    let Some((min, max)) = field.bounds else {
        return Ok(());
    };
    let mut numbers = Vec::new();
    value.numbers(&mut numbers);
    match numbers
        .into_iter()
        .find(|&n| n < min as i128 || n > max as i128)
    {
        Some(n) => Err(cx.range(format!(
            "value {n} of {} must be between {min} and {max}",
            field.key
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::symbols::SymbolMap;

    fn symbols() -> SymbolMap {
        let mut map = SymbolMap::new()
            .with("Type", &["FIRE", "WATER", "GRASS"])
            .with("Move", &["TACKLE", "GROWL"]);
        map.insert("Stat", "HP", "HP");
        map
    }

    fn run(raw: &str, grammar: &str, namespaces: &[&'static str]) -> Result<Value, CompileError> {
        let table = symbols();
        let location = Location::file("test.txt");
        let cx = DecodeContext::new(&table, &location);
        decode(raw, &TypeSpec::parse(grammar, namespaces).unwrap(), &cx)
    }

    fn list(items: Vec<Value>) -> Value {
        Value::List(items)
    }

    // -----------------------------------------------------------------------
    // Scalars
    // -----------------------------------------------------------------------

    #[test]
    fn unsigned_and_signed_integers() {
        assert_eq!(run("42", "u", &[]).unwrap(), Value::UInt(42));
        assert_eq!(run("-3", "i", &[]).unwrap(), Value::Int(-3));
        assert!(matches!(run("-3", "u", &[]), Err(CompileError::Range { .. })));
        assert!(matches!(run("abc", "u", &[]), Err(CompileError::Grammar { .. })));
        assert!(matches!(
            run("99999999999999999999", "u", &[]),
            Err(CompileError::Range { .. })
        ));
    }

    #[test]
    fn positive_rejects_zero_with_range_error() {
        assert_eq!(run("1", "v", &[]).unwrap(), Value::UInt(1));
        assert!(matches!(run("0", "v", &[]), Err(CompileError::Range { .. })));
    }

    #[test]
    fn hex_and_float() {
        assert_eq!(run("0x1F", "x", &[]).unwrap(), Value::UInt(31));
        assert_eq!(run("ff", "x", &[]).unwrap(), Value::UInt(255));
        assert_eq!(run("0.7", "f", &[]).unwrap(), Value::Float(0.7));
        assert!(run("fast", "f", &[]).is_err());
    }

    #[test]
    fn booleans_accept_all_spellings() {
        for t in ["true", "YES", "y", "T", "1"] {
            assert_eq!(run(t, "b", &[]).unwrap(), Value::Bool(true), "{t}");
        }
        for f in ["false", "No", "n", "f", "0"] {
            assert_eq!(run(f, "b", &[]).unwrap(), Value::Bool(false), "{f}");
        }
        assert!(run("maybe", "b", &[]).is_err());
    }

    #[test]
    fn names_must_be_identifiers() {
        assert_eq!(run("Trainer_1", "n", &[]).unwrap(), Value::sym("Trainer_1"));
        assert!(run("1Trainer", "n", &[]).is_err());
        assert_eq!(run("1Trainer", "m", &[]).unwrap(), Value::sym("1Trainer"));
    }

    #[test]
    fn quoted_strings_keep_commas_and_escapes() {
        assert_eq!(run("\"Hi, there\"", "s", &[]).unwrap(), Value::str("Hi, there"));
        assert_eq!(
            run(r#""say \"hi\" \\ ok""#, "s", &[]).unwrap(),
            Value::str(r#"say "hi" \ ok"#)
        );
        assert!(run("\"open", "s", &[]).is_err());
    }

    #[test]
    fn unformatted_string_takes_the_rest() {
        assert_eq!(
            run("A, B, and C.", "q", &[]).unwrap(),
            Value::str("A, B, and C.")
        );
        assert_eq!(
            run("3, Some text, more", "uq", &[]).unwrap(),
            list(vec![Value::UInt(3), Value::str("Some text, more")])
        );
    }

    #[test]
    fn empty_required_string_is_empty_str() {
        assert_eq!(run("", "s", &[]).unwrap(), Value::str(""));
        assert!(matches!(run("", "u", &[]), Err(CompileError::Grammar { .. })));
        assert_eq!(run("", "U", &[]).unwrap(), Value::Nil);
    }

    // -----------------------------------------------------------------------
    // Enums
    // -----------------------------------------------------------------------

    #[test]
    fn enum_resolves_through_symbols() {
        assert_eq!(run("FIRE", "e", &["Type"]).unwrap(), Value::sym("FIRE"));
        match run("LAVA", "e", &["Type"]) {
            Err(CompileError::Reference { namespace, value, .. }) => {
                assert_eq!(namespace, "Type");
                assert_eq!(value, "LAVA");
            }
            other => panic!("expected reference error, got {other:?}"),
        }
    }

    #[test]
    fn enum_or_int_accepts_numbers() {
        assert_eq!(run("5", "y", &["Type"]).unwrap(), Value::Int(5));
        assert_eq!(run("WATER", "y", &["Type"]).unwrap(), Value::sym("WATER"));
    }

    #[test]
    fn own_namespace_is_kept_as_forward_reference() {
        let table = symbols();
        let location = Location::file("types.txt");
        let cx = DecodeContext::new(&table, &location).own_namespace("Type");
        let spec = TypeSpec::parse("*e", &["Type"]).unwrap();
        let value = decode("FIRE,LAVA", &spec, &cx).unwrap();
        assert_eq!(value, list(vec![Value::sym("FIRE"), Value::sym("LAVA")]));
    }

    // -----------------------------------------------------------------------
    // Tuples and repeats
    // -----------------------------------------------------------------------

    #[test]
    fn tuple_fills_missing_optional_slots_with_nil() {
        assert_eq!(
            run("3, 4", "uuS", &[]).unwrap(),
            list(vec![Value::UInt(3), Value::UInt(4), Value::Nil])
        );
    }

    #[test]
    fn tuple_all_nil_is_nil() {
        assert_eq!(run(",", "UU", &[]).unwrap(), Value::Nil);
    }

    #[test]
    fn tuple_rejects_extra_tokens() {
        assert!(matches!(run("1,2,3", "uu", &[]), Err(CompileError::Grammar { .. })));
        assert!(matches!(run("1,2", "u", &[]), Err(CompileError::Grammar { .. })));
    }

    #[test]
    fn repeat_single_slot_is_flat_list() {
        assert_eq!(
            run("FIRE, WATER,,GRASS", "*e", &["Type"]).unwrap(),
            list(vec![Value::sym("FIRE"), Value::sym("WATER"), Value::sym("GRASS")])
        );
    }

    #[test]
    fn repeat_pairs_form_tuples() {
        assert_eq!(
            run("1,TACKLE,4,GROWL", "*ue", &["Move"]).unwrap(),
            list(vec![
                list(vec![Value::UInt(1), Value::sym("TACKLE")]),
                list(vec![Value::UInt(4), Value::sym("GROWL")]),
            ])
        );
    }

    #[test]
    fn repeat_incomplete_group_is_an_error() {
        assert!(run("1,TACKLE,4", "*ue", &["Move"]).is_err());
    }

    #[test]
    fn repeat_of_nothing_is_nil() {
        assert_eq!(run("", "*e", &["Type"]).unwrap(), Value::Nil);
        assert_eq!(run(" , ", "*e", &["Type"]).unwrap(), Value::Nil);
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    fn field_schema() -> Schema {
        Schema::builder("Test")
            .field("Point", "point", "^uussUUUU")
            .field("Accuracy", "accuracy", "u")
            .bounded(0, 100)
            .field("Home", "home", "vuuU")
            .defaults(vec![Value::Nil, Value::Nil, Value::Nil, Value::UInt(2)])
            .enum_field("Types", "types", "*e", &["Type"])
            .build()
            .unwrap()
    }

    fn run_field(key: &str, raw: RawValue) -> Result<Value, CompileError> {
        let schema = field_schema();
        let table = symbols();
        let location = Location::file("test.txt").with_section("X");
        let cx = DecodeContext::new(&table, &location);
        decode_field(&raw, schema.field(key).unwrap(), &cx)
    }

    fn occurrences(lines: &[(&str, usize)]) -> RawValue {
        let mut text = String::from("[X]\n");
        let mut line = 2;
        for (t, at) in lines {
            while line < *at {
                text.push('\n');
                line += 1;
            }
            text.push_str(&format!("Point = {t}\n"));
            line += 1;
        }
        let section = crate::reader::SectionReader::new("test.txt", &text)
            .next()
            .unwrap()
            .unwrap();
        section.entries().remove(0).1
    }

    #[test]
    fn repeatable_field_collects_each_occurrence() {
        let raw = occurrences(&[("1,2,Town,", 2), ("3,4,Route,Lake", 3)]);
        let value = run_field("Point", raw).unwrap();
        let items = value.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].at(2), &Value::str("Town"));
        assert_eq!(items[0].at(3), &Value::str(""));
        assert_eq!(items[1].at(3), &Value::str("Lake"));
    }

    #[test]
    fn non_repeatable_field_rejects_recurrence() {
        assert!(run_field("Accuracy", RawValue::single("50", 2)).is_ok());
        let twice = occurrences(&[("50", 2), ("60", 4)]);
        assert!(twice.is_repeated());
        match run_field("Accuracy", twice) {
            Err(CompileError::Grammar { location, message }) => {
                assert_eq!(location.line, Some(4));
                assert!(message.contains("Accuracy"));
            }
            other => panic!("expected grammar error, got {other:?}"),
        }
    }

    #[test]
    fn bounds_are_checked() {
        assert!(matches!(
            run_field("Accuracy", RawValue::single("101", 7)),
            Err(CompileError::Range { .. })
        ));
        assert_eq!(
            run_field("Accuracy", RawValue::single("100", 7)).unwrap(),
            Value::UInt(100)
        );
    }

    #[test]
    fn defaults_fill_trailing_slots() {
        let value = run_field("Home", RawValue::single("3,7,5", 1)).unwrap();
        assert_eq!(value.at(3), &Value::UInt(2));
    }

    #[test]
    fn errors_carry_the_occurrence_line() {
        match run_field("Types", RawValue::single("FIRE,LAVA", 9)) {
            Err(CompileError::Reference { location, .. }) => {
                assert_eq!(location.line, Some(9));
                assert_eq!(location.section.as_deref(), Some("X"));
            }
            other => panic!("expected reference error, got {other:?}"),
        }
    }
}
