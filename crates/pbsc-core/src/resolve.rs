//! Phase-2 building blocks shared by datasets: inverse-edge synthesis,
//! inheritance of unset fields from a base record, weighted-slot
//! aggregation, and numbered-variant identifiers.

use crate::id::Identifier;
use crate::record::Record;
use crate::store::DataStore;
use crate::value::Value;
use std::collections::HashMap;

// ===========================================================================
// Edges
// ===========================================================================

/// One element of an edge list field: `[target, kind, parameter, inverse]`.
///
/// Forward edges point at the records this one leads to; an inverse edge
/// points back at the record that leads here.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub target: String,
    pub kind: Value,
    pub parameter: Value,
    pub inverse: bool,
}

impl Edge {
    pub fn forward(target: impl Into<String>, kind: Value, parameter: Value) -> Self {
        Self {
            target: target.into(),
            kind,
            parameter,
            inverse: false,
        }
    }

    pub fn from_value(value: &Value) -> Option<Edge> {
        Some(Edge {
            target: value.at(0).as_str()?.to_string(),
            kind: value.at(1).clone(),
            parameter: value.at(2).clone(),
            inverse: value.at(3).as_bool().unwrap_or(false),
        })
    }

    pub fn to_value(&self) -> Value {
        Value::List(vec![
            Value::sym(self.target.clone()),
            self.kind.clone(),
            self.parameter.clone(),
            Value::Bool(self.inverse),
        ])
    }
}

/// The edges stored in `field` of `record`.
pub fn edges(record: &Record, field: &str) -> Vec<Edge> {
    record.list(field).iter().filter_map(Edge::from_value).collect()
}

fn push_edge(record: &mut Record, field: &str, edge: &Edge) {
    match record.get_mut(field).and_then(Value::as_list_mut) {
        Some(list) => list.push(edge.to_value()),
        None => record.set(field, Value::List(vec![edge.to_value()])),
    }
}

/// Give every record that some other record leads to an inverse edge back.
///
/// `group_of` maps a record to the key edges target (a species for all of
/// its forms). The first forward edge found for a key, in store order,
/// wins. Records that already list an inverse edge are skipped, and the
/// source gains a forward edge (kind `none_kind`) if it has none towards
/// the key, so running this again changes nothing.
///
/// Returns the number of inverse edges added.
pub fn synthesize_inverse_edges<G>(
    store: &mut DataStore,
    field: &str,
    none_kind: &str,
    group_of: G,
) -> usize
where
    G: Fn(&Record) -> String,
{
    let mut sources: HashMap<String, Edge> = HashMap::new();
    for record in store.each() {
        for edge in edges(record, field).into_iter().filter(|e| !e.inverse) {
            sources.entry(edge.target.clone()).or_insert_with(|| Edge {
                target: group_of(record),
                kind: edge.kind,
                parameter: edge.parameter,
                inverse: true,
            });
        }
    }

    let mut added = 0;
    for id in store.ids() {
        let Some(record) = store.get(&id) else {
            continue;
        };
        if edges(record, field).iter().any(|e| e.inverse) {
            continue;
        }
        let key = group_of(record);
        let Some(inverse) = sources.get(&key) else {
            continue;
        };
        if let Some(record) = store.get_mut(&id) {
            push_edge(record, field, inverse);
            added += 1;
        }
        if let Some(source) = store.get_mut(&Identifier::from(inverse.target.as_str())) {
            let leads_here = edges(source, field)
                .iter()
                .any(|e| !e.inverse && e.target == key);
            if !leads_here {
                push_edge(source, field, &Edge::forward(key, Value::sym(none_kind), Value::Nil));
            }
        }
    }
    added
}

// ===========================================================================
// Inheritance
// ===========================================================================

/// How a variant takes a field from its base when it does not set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inherit {
    /// Copy when absent or `Nil`.
    Scalar(&'static str),
    /// Copy when absent, `Nil` or empty. An explicitly empty list in the
    /// variant therefore still inherits.
    Collection(&'static str),
    /// Copy every member when all members are absent or `Nil`.
    Group(&'static [&'static str]),
}

/// Fill unset fields of `variant` from `base` following `rules`. Values
/// are deep copies; the two records never share data.
pub fn inherit(variant: &mut Record, base: &Record, rules: &[Inherit]) {
    for rule in rules {
        match *rule {
            Inherit::Scalar(field) => {
                if variant.is_unset(field) {
                    copy_field(variant, base, field);
                }
            }
            Inherit::Collection(field) => {
                if variant.is_unset_or_empty(field) {
                    copy_field(variant, base, field);
                }
            }
            Inherit::Group(fields) => {
                if fields.iter().all(|f| variant.is_unset(f)) {
                    for field in fields {
                        copy_field(variant, base, field);
                    }
                }
            }
        }
    }
}

fn copy_field(variant: &mut Record, base: &Record, field: &str) {
    if let Some(value) = base.get(field) {
        variant.set(field, value.clone());
    }
}

// ===========================================================================
// Weighted aggregation
// ===========================================================================

/// An item that can be merged with identical items by summing weights.
pub trait Weighted {
    type Key: PartialEq;

    /// Items with equal keys are merged.
    fn key(&self) -> Self::Key;
    fn weight(&self) -> u64;
    fn set_weight(&mut self, weight: u64);
    /// Orders items of equal weight, ascending.
    fn tiebreak(&self) -> String;
}

/// Summing the weights of identical items does not fit in a `u64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightOverflow<K> {
    pub key: K,
}

/// Merge items with equal keys into their first occurrence (summing
/// weights), then sort by weight descending and tiebreak ascending.
pub fn aggregate_weighted<T: Weighted>(items: Vec<T>) -> Result<Vec<T>, WeightOverflow<T::Key>> {
    let mut merged: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let key = item.key();
        match merged.iter_mut().find(|m| m.key() == key) {
            Some(existing) => {
                let total = existing
                    .weight()
                    .checked_add(item.weight())
                    .ok_or(WeightOverflow { key })?;
                existing.set_weight(total);
            }
            None => merged.push(item),
        }
    }
    merged.sort_by(|a, b| {
        b.weight()
            .cmp(&a.weight())
            .then_with(|| a.tiebreak().cmp(&b.tiebreak()))
    });
    Ok(merged)
}

// ===========================================================================
// Variant identifiers
// ===========================================================================

/// Split a `[base, number]` section identifier.
///
/// Returns the base, the number (0 when omitted) and the record's new
/// identifier: `BASE_n`, or plain `BASE` for number 0 when
/// `zero_is_base` is set.
pub fn split_variant(id: &Identifier, zero_is_base: bool) -> Option<(String, u64, Identifier)> {
    let (base, number) = match id {
        Identifier::Sym(base) => (base.clone(), 0),
        Identifier::Compound(parts) => match parts.as_slice() {
            [Identifier::Sym(base)] => (base.clone(), 0),
            [Identifier::Sym(base), Identifier::Num(n)] => (base.clone(), *n),
            _ => return None,
        },
        Identifier::Num(_) => return None,
    };
    let id = if number == 0 && zero_is_base {
        Identifier::from(base.as_str())
    } else {
        Identifier::variant(&base, number)
    };
    Some((base, number, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evo(target: &str) -> Value {
        Edge::forward(target, Value::sym("Level"), Value::UInt(16)).to_value()
    }

    fn species(id: &str, base: &str, evolutions: Vec<Value>) -> Record {
        Record::new(id)
            .with("species", Value::sym(base))
            .with("evolutions", Value::List(evolutions))
    }

    fn group(record: &Record) -> String {
        record.str("species").unwrap_or_default().to_string()
    }

    fn line() -> DataStore {
        let mut store = DataStore::new("Species");
        store.insert(species("BULBASAUR", "BULBASAUR", vec![evo("IVYSAUR")])).unwrap();
        store.insert(species("IVYSAUR", "IVYSAUR", vec![evo("VENUSAUR")])).unwrap();
        store.insert(species("VENUSAUR", "VENUSAUR", vec![])).unwrap();
        store
    }

    // -----------------------------------------------------------------------
    // Inverse edges
    // -----------------------------------------------------------------------

    #[test]
    fn inverse_edges_point_back_at_source() {
        let mut store = line();
        let added = synthesize_inverse_edges(&mut store, "evolutions", "None", group);
        assert_eq!(added, 2);
        let ivysaur = edges(store.get(&"IVYSAUR".into()).unwrap(), "evolutions");
        let prevo = ivysaur.iter().find(|e| e.inverse).unwrap();
        assert_eq!(prevo.target, "BULBASAUR");
        assert_eq!(prevo.kind, Value::sym("Level"));
        assert_eq!(prevo.parameter, Value::UInt(16));
        assert!(edges(store.get(&"BULBASAUR".into()).unwrap(), "evolutions")
            .iter()
            .all(|e| !e.inverse));
    }

    #[test]
    fn synthesis_is_idempotent() {
        let mut store = line();
        synthesize_inverse_edges(&mut store, "evolutions", "None", group);
        let once: Vec<Record> = store.each().cloned().collect();
        let added = synthesize_inverse_edges(&mut store, "evolutions", "None", group);
        let twice: Vec<Record> = store.each().cloned().collect();
        assert_eq!(added, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn forms_share_their_species_prevolution() {
        let mut store = line();
        store.insert(species("IVYSAUR_1", "IVYSAUR", vec![])).unwrap();
        synthesize_inverse_edges(&mut store, "evolutions", "None", group);
        let form = edges(store.get(&"IVYSAUR_1".into()).unwrap(), "evolutions");
        assert_eq!(form.len(), 1);
        assert_eq!(form[0].target, "BULBASAUR");
        assert!(form[0].inverse);
    }

    #[test]
    fn missing_forward_edge_is_added_to_source() {
        let mut store = DataStore::new("Species");
        store.insert(species("A", "A", vec![evo("B")])).unwrap();
        store.insert(species("A_1", "A", vec![evo("C")])).unwrap();
        store.insert(species("B", "B", vec![])).unwrap();
        store.insert(species("C", "C", vec![])).unwrap();
        synthesize_inverse_edges(&mut store, "evolutions", "None", group);
        // C's prevolution is species A, whose base record had no edge to C.
        let a = edges(store.get(&"A".into()).unwrap(), "evolutions");
        let to_c = a.iter().find(|e| e.target == "C").unwrap();
        assert!(!to_c.inverse);
        assert_eq!(to_c.kind, Value::sym("None"));
    }

    // -----------------------------------------------------------------------
    // Inheritance
    // -----------------------------------------------------------------------

    const RULES: &[Inherit] = &[
        Inherit::Scalar("height"),
        Inherit::Collection("moves"),
        Inherit::Group(&["item_common", "item_rare"]),
    ];

    fn base() -> Record {
        Record::new("BASE")
            .with("height", 10u64)
            .with("moves", Value::List(vec![Value::sym("TACKLE")]))
            .with("item_common", Value::sym("ORAN"))
            .with("item_rare", Value::sym("SITRUS"))
    }

    #[test]
    fn unset_fields_are_copied() {
        let mut variant = Record::new("BASE_1");
        inherit(&mut variant, &base(), RULES);
        assert_eq!(variant.u64("height"), Some(10));
        assert_eq!(variant.list("moves"), &[Value::sym("TACKLE")]);
        assert_eq!(variant.str("item_rare"), Some("SITRUS"));
    }

    #[test]
    fn set_fields_are_kept() {
        let mut variant = Record::new("BASE_1").with("height", 20u64);
        inherit(&mut variant, &base(), RULES);
        assert_eq!(variant.u64("height"), Some(20));
    }

    #[test]
    fn empty_collection_still_inherits() {
        let mut variant = Record::new("BASE_1").with("moves", Value::List(vec![]));
        inherit(&mut variant, &base(), RULES);
        assert_eq!(variant.list("moves").len(), 1);
    }

    #[test]
    fn group_is_all_or_nothing() {
        let mut variant = Record::new("BASE_1").with("item_common", Value::sym("LEPPA"));
        inherit(&mut variant, &base(), RULES);
        assert_eq!(variant.str("item_common"), Some("LEPPA"));
        assert!(variant.is_unset("item_rare"));
    }

    #[test]
    fn inherited_values_do_not_alias() {
        let base = base();
        let mut variant = Record::new("BASE_1");
        inherit(&mut variant, &base, RULES);
        if let Some(list) = variant.get_mut("moves").and_then(Value::as_list_mut) {
            list.push(Value::sym("GROWL"));
        }
        assert_eq!(base.list("moves").len(), 1);
        assert_eq!(variant.list("moves").len(), 2);
    }

    // -----------------------------------------------------------------------
    // Aggregation
    // -----------------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Slot(u64, &'static str, u64, u64);

    impl Weighted for Slot {
        type Key = (&'static str, u64, u64);
        fn key(&self) -> Self::Key {
            (self.1, self.2, self.3)
        }
        fn weight(&self) -> u64 {
            self.0
        }
        fn set_weight(&mut self, weight: u64) {
            self.0 = weight;
        }
        fn tiebreak(&self) -> String {
            self.1.to_string()
        }
    }

    #[test]
    fn identical_slots_merge_and_sort_by_weight() {
        let slots = vec![
            Slot(20, "A", 5, 5),
            Slot(20, "B", 3, 3),
            Slot(5, "A", 5, 5),
        ];
        let merged = aggregate_weighted(slots).unwrap();
        assert_eq!(merged, vec![Slot(25, "A", 5, 5), Slot(20, "B", 3, 3)]);
    }

    #[test]
    fn equal_weights_sort_by_tiebreak() {
        let slots = vec![Slot(10, "RATTATA", 2, 2), Slot(10, "PIDGEY", 2, 2), Slot(30, "ZUBAT", 1, 1)];
        let merged = aggregate_weighted(slots).unwrap();
        let order: Vec<_> = merged.iter().map(|s| s.1).collect();
        assert_eq!(order, vec!["ZUBAT", "PIDGEY", "RATTATA"]);
    }

    #[test]
    fn different_levels_do_not_merge() {
        let merged = aggregate_weighted(vec![Slot(10, "A", 2, 2), Slot(10, "A", 3, 3)]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn summed_weight_past_u64_max_is_reported() {
        let slots = vec![Slot(u64::MAX, "A", 5, 5), Slot(7, "B", 5, 5), Slot(1, "A", 5, 5)];
        assert_eq!(aggregate_weighted(slots), Err(WeightOverflow { key: ("A", 5, 5) }));

        let fits = aggregate_weighted(vec![Slot(u64::MAX - 1, "A", 5, 5), Slot(1, "A", 5, 5)]).unwrap();
        assert_eq!(fits, vec![Slot(u64::MAX, "A", 5, 5)]);
    }

    // -----------------------------------------------------------------------
    // Variants
    // -----------------------------------------------------------------------

    #[test]
    fn split_variant_builds_numbered_ids() {
        let id = Identifier::Compound(vec!["VENUSAUR".into(), Identifier::Num(1)]);
        let (base, n, new_id) = split_variant(&id, false).unwrap();
        assert_eq!(base, "VENUSAUR");
        assert_eq!(n, 1);
        assert_eq!(new_id, Identifier::from("VENUSAUR_1"));
    }

    #[test]
    fn split_variant_zero_collapses_to_base() {
        let id = Identifier::Compound(vec!["CAVE".into()]);
        let (_, n, new_id) = split_variant(&id, true).unwrap();
        assert_eq!(n, 0);
        assert_eq!(new_id, Identifier::from("CAVE"));
        let (_, _, kept) = split_variant(&id, false).unwrap();
        assert_eq!(kept, Identifier::from("CAVE_0"));
        assert!(split_variant(&Identifier::Num(3), true).is_none());
    }
}
