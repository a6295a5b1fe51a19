//! The collector: an insertion-ordered key -> value accumulator
//!
//! One collector exists per template run; page cycles and foreach
//! iterations execute against child scopes cloned from it, so sibling
//! iterations never see each other's keys. Iteration results are stored
//! back into the parent under `item_<n>` keys and flattened when a record
//! is emitted.

use serde_json::{Map, Value};

const ITEM_PREFIX: &str = "item_";

/// Accumulating key -> value record for one scope.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    entries: Map<String, Value>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of the current contents as a JSON object.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.entries.clone())
    }

    /// Clone for a child scope. `item_<n>` results of loops that already
    /// ran in this scope stay behind; everything else is inherited.
    pub fn child_scope(&self) -> Collector {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| parse_item_key(key).is_none())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Collector { entries }
    }

    /// Merge every entry of `other` into this scope (opened-tab results
    /// folding back into the parent).
    pub fn merge(&mut self, other: Collector) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    /// Store a foreach iteration's result under its `item_<n>` key.
    pub fn insert_item(&mut self, index: usize, value: Value) {
        self.entries.insert(format!("{ITEM_PREFIX}{index}"), value);
    }

    /// Whether any foreach iteration stored a result in this scope.
    pub fn has_items(&self) -> bool {
        self.entries.keys().any(|key| parse_item_key(key).is_some())
    }

    /// One emitted record for this scope: if nested loops stored
    /// `item_<n>` results, they are flattened (in index order, empty ones
    /// dropped) into an array; otherwise the scope itself is the record.
    pub fn flatten_record(&self) -> Value {
        let mut items: Vec<(usize, &Value)> = self
            .entries
            .iter()
            .filter_map(|(key, value)| parse_item_key(key).map(|index| (index, value)))
            .collect();
        if items.is_empty() {
            return self.snapshot();
        }
        items.sort_by_key(|(index, _)| *index);
        Value::Array(
            items
                .into_iter()
                .filter(|(_, value)| !record_is_empty(value))
                .map(|(_, value)| value.clone())
                .collect(),
        )
    }
}

fn parse_item_key(key: &str) -> Option<usize> {
    key.strip_prefix(ITEM_PREFIX)?.parse().ok()
}

fn record_is_empty(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let mut collector = Collector::new();
        collector.insert("zebra", json!("z"));
        collector.insert("alpha", json!("a"));
        let keys: Vec<_> = collector
            .snapshot()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["zebra", "alpha"]);
    }

    #[test]
    fn test_child_scope_drops_item_keys() {
        let mut collector = Collector::new();
        collector.insert("base", json!("kept"));
        collector.insert_item(0, json!({"title": "a"}));
        let child = collector.child_scope();
        assert_eq!(child.get("base"), Some(&json!("kept")));
        assert!(!child.has_items());
    }

    #[test]
    fn test_flatten_without_items_is_snapshot() {
        let mut collector = Collector::new();
        collector.insert("title", json!("hello"));
        assert_eq!(collector.flatten_record(), json!({"title": "hello"}));
    }

    #[test]
    fn test_flatten_orders_items_and_drops_empty() {
        let mut collector = Collector::new();
        collector.insert_item(10, json!({"n": 10}));
        collector.insert_item(2, json!({}));
        collector.insert_item(0, json!({"n": 0}));
        assert_eq!(
            collector.flatten_record(),
            json!([{"n": 0}, {"n": 10}])
        );
    }

    #[test]
    fn test_merge_overwrites() {
        let mut parent = Collector::new();
        parent.insert("k", json!("old"));
        let mut child = Collector::new();
        child.insert("k", json!("new"));
        child.insert("extra", json!(1));
        parent.merge(child);
        assert_eq!(parent.get("k"), Some(&json!("new")));
        assert_eq!(parent.get("extra"), Some(&json!(1)));
    }
}
