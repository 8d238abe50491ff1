//! The cost table and structural cost lookup (spec.md §4.7).
//!
//! Grounded on `examples/original_source/metering.go`'s `getCost` for the
//! recursion, and `examples/original_source/test/default_cost_table.go`
//! for the tree shape. `CostValue` is `serde::Deserialize` the way
//! `wrt-build-core`'s config types are, so embedders can load a cost table
//! from JSON.

use std::collections::HashMap;

use serde::Deserialize;

use crate::module::{LocalEntry, TypeEntry};

/// The fallback key consulted when a more specific key is absent.
pub const DEFAULT_KEY: &str = "DEFAULT";

/// One node of the cost table tree: either a flat cost, or a nested table
/// keyed by field/op name, resolved structurally by [`get_cost`],
/// [`type_cost`] and [`locals_cost`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CostValue {
    Flat(u64),
    Table(HashMap<String, CostValue>),
}

impl Default for CostValue {
    fn default() -> Self {
        Self::Table(HashMap::new())
    }
}

impl CostValue {
    /// The named child of a table node, or `None` for a flat node or a
    /// table node with no such key.
    pub fn field(&self, key: &str) -> Option<&CostValue> {
        match self {
            Self::Flat(_) => None,
            Self::Table(map) => map.get(key),
        }
    }
}

/// Cost of a string-valued leaf (spec.md §4.7's "value is a string" case):
/// `subtable[value]` if present, else `subtable["DEFAULT"]`, else `0`.
pub fn get_cost(value: &str, subtable: &CostValue) -> u64 {
    match subtable.field(value) {
        Some(entry) => leaf_or_default(entry, subtable),
        None => leaf_or_default_missing(subtable),
    }
}

fn leaf_or_default(entry: &CostValue, subtable: &CostValue) -> u64 {
    match entry {
        CostValue::Flat(cost) => *cost,
        CostValue::Table(_) => leaf_or_default_missing(subtable),
    }
}

fn leaf_or_default_missing(subtable: &CostValue) -> u64 {
    match subtable.field(DEFAULT_KEY) {
        Some(CostValue::Flat(cost)) => *cost,
        _ => 0,
    }
}

/// Cost of a non-string, non-sequence, non-record leaf (spec.md §4.7's
/// "otherwise return the default" case): the subtable's own `DEFAULT`, or
/// `0`.
fn scalar_cost(subtable: &CostValue) -> u64 {
    leaf_or_default_missing(subtable)
}

/// Cost of a function signature (spec.md §4.7's `type_cost`): a record
/// whose fields are `form`, `params` (a sequence of value-type leaves) and
/// `return_type` (an optional value-type leaf).
pub fn type_cost(entry: &TypeEntry, subtable: &CostValue) -> u64 {
    let mut cost = 0;
    if let Some(sub) = subtable.field("form") {
        cost += get_cost(entry.form.name(), sub);
    }
    if let Some(sub) = subtable.field("params") {
        cost += entry.params.iter().map(|p| get_cost(p.name(), sub)).sum::<u64>();
    }
    if let Some(sub) = subtable.field("return_type") {
        if let Some(rt) = entry.return_type {
            cost += get_cost(rt.name(), sub);
        }
    }
    cost
}

/// Cost of a code body's local declarations (spec.md §4.7's `locals_cost`):
/// a sequence of `(count, type)` records.
pub fn locals_cost(locals: &[LocalEntry], subtable: &CostValue) -> u64 {
    locals.iter().map(|l| local_entry_cost(l, subtable)).sum()
}

fn local_entry_cost(local: &LocalEntry, subtable: &CostValue) -> u64 {
    let mut cost = 0;
    if let Some(sub) = subtable.field("count") {
        cost += scalar_cost(sub);
    }
    if let Some(sub) = subtable.field("type") {
        cost += get_cost(local.ty.name(), sub);
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::LangType;

    fn table(entries: &[(&str, CostValue)]) -> CostValue {
        CostValue::Table(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn exact_key_wins_over_default() {
        let t = table(&[("add", CostValue::Flat(2)), (DEFAULT_KEY, CostValue::Flat(1))]);
        assert_eq!(get_cost("add", &t), 2);
        assert_eq!(get_cost("sub", &t), 1);
    }

    #[test]
    fn missing_key_and_default_is_zero() {
        let t = table(&[("add", CostValue::Flat(2))]);
        assert_eq!(get_cost("sub", &t), 0);
    }

    #[test]
    fn json_deserializes_nested_tables() {
        let json = r#"{"code":{"DEFAULT":1,"call":5}}"#;
        let parsed: CostValue = serde_json::from_str(json).unwrap();
        let code = parsed.field("code").unwrap();
        assert_eq!(get_cost("call", code), 5);
        assert_eq!(get_cost("drop", code), 1);
    }

    #[test]
    fn type_cost_sums_params_and_return() {
        let entry = TypeEntry {
            form: LangType::Func,
            params: vec![LangType::I32, LangType::I32],
            return_type: Some(LangType::I32),
        };
        let subtable = table(&[
            ("params", table(&[(DEFAULT_KEY, CostValue::Flat(1))])),
            ("return_type", table(&[(DEFAULT_KEY, CostValue::Flat(3))])),
        ]);
        assert_eq!(type_cost(&entry, &subtable), 2 + 3);
    }

    #[test]
    fn locals_cost_counts_declarations() {
        let locals = vec![
            LocalEntry { count: 2, ty: LangType::I32 },
            LocalEntry { count: 1, ty: LangType::F64 },
        ];
        let subtable = table(&[("count", table(&[(DEFAULT_KEY, CostValue::Flat(1))]))]);
        assert_eq!(locals_cost(&locals, &subtable), 1 + 1);
    }
}
