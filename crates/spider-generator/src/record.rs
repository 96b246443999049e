//! Attribute records: the site-wide metadata accumulated for one detected
//! organization.
//!
//! A record is an insertion-ordered mapping from attribute name to a JSON
//! value. The renderer understands strings, string-keyed mappings of strings
//! and sequences of strings; anything else is carried but never rendered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NAME: &str = "name";
pub const ITEM_ATTRIBUTES: &str = "item_attributes";
pub const ALLOWED_DOMAINS: &str = "allowed_domains";
pub const START_URLS: &str = "start_urls";

/// Leading marker of implementation-private keys.
pub const PRIVATE_PREFIX: char = '_';

/// Serialized as a plain JSON object. Deserializing goes through
/// [`AttributeRecord::insert`], so null values never survive a load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct AttributeRecord(Map<String, Value>);

impl AttributeRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Set `key`, replacing any previous value. A `null` value removes the key
    /// so that no attribute ever maps to null.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if value.is_null() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Additively merge `other` into this record.
    ///
    /// Keys not yet present are added. Nested mappings merge key by key and
    /// sequences gain only the elements they lack. A value that is already
    /// set is kept unless it is null or an empty string; use [`revise`] to
    /// replace a confirmed value.
    ///
    /// [`revise`]: AttributeRecord::revise
    pub fn merge(&mut self, other: AttributeRecord) {
        for (key, value) in other.0 {
            if value.is_null() {
                continue;
            }
            match self.0.get_mut(&key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.0.insert(key, value);
                }
            }
        }
    }

    /// Builder-style [`merge`](AttributeRecord::merge).
    pub fn merged(mut self, other: AttributeRecord) -> Self {
        self.merge(other);
        self
    }

    /// Explicitly replace a value an earlier step set provisionally.
    pub fn revise(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.insert(key, value);
    }

    /// Write `key` into the nested `item_attributes` mapping, creating the
    /// mapping when it is missing or not a mapping.
    pub fn set_item_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let entry = self
            .0
            .entry(ITEM_ATTRIBUTES)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(attributes) = entry {
            attributes.insert(key.into(), Value::String(value.into()));
        }
    }

    /// Drop every key beginning with the private marker.
    pub fn strip_private(&mut self) {
        self.0.retain(|key, _| !is_private(key));
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for AttributeRecord {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<AttributeRecord> for Map<String, Value> {
    fn from(record: AttributeRecord) -> Self {
        record.0
    }
}

impl FromIterator<(String, Value)> for AttributeRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = AttributeRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Value); N]> for AttributeRecord {
    fn from(pairs: [(K, Value); N]) -> Self {
        pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
    }
}

pub fn is_private(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

fn is_less_specific(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(str::is_empty)
}

fn merge_value(existing: &mut Value, incoming: Value) {
    match (existing, incoming) {
        (Value::Object(current), Value::Object(update)) => {
            for (key, value) in update {
                if value.is_null() {
                    continue;
                }
                match current.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        current.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(current), Value::Array(update)) => {
            for value in update {
                if !current.contains(&value) {
                    current.push(value);
                }
            }
        }
        (slot, value) if is_less_specific(slot) => *slot = value,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_null_removes_key() {
        let mut record = AttributeRecord::from([("key", json!("abc"))]);
        record.insert("key", Value::Null);
        assert!(record.is_empty());
    }

    #[test]
    fn test_merge_adds_missing_keys_and_keeps_existing() {
        let mut record = AttributeRecord::from([("api_key", json!("first"))]);
        record.merge(AttributeRecord::from([
            ("api_key", json!("second")),
            ("api_endpoint", json!("https://hosted.example/rest")),
        ]));

        assert_eq!(record.get_str("api_key"), Some("first"));
        assert_eq!(
            record.get_str("api_endpoint"),
            Some("https://hosted.example/rest")
        );
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_merge_replaces_less_specific_values() {
        let mut record = AttributeRecord::from([("key", json!(""))]);
        record.merge(AttributeRecord::from([("key", json!("u1234"))]));
        assert_eq!(record.get_str("key"), Some("u1234"));
    }

    #[test]
    fn test_merge_nested_mapping_and_sequences() {
        let mut record = AttributeRecord::from([
            ("item_attributes", json!({"brand": "Acme"})),
            ("start_urls", json!(["https://acme.example/a"])),
        ]);
        record.merge(AttributeRecord::from([
            ("item_attributes", json!({"brand": "Other", "brand_wikidata": "Q1"})),
            (
                "start_urls",
                json!(["https://acme.example/a", "https://acme.example/b"]),
            ),
        ]));

        assert_eq!(
            record.get("item_attributes"),
            Some(&json!({"brand": "Acme", "brand_wikidata": "Q1"}))
        );
        assert_eq!(
            record.get("start_urls"),
            Some(&json!(["https://acme.example/a", "https://acme.example/b"]))
        );
    }

    #[test]
    fn test_revise_overwrites() {
        let mut record = AttributeRecord::from([("key", json!("provisional"))]);
        record.revise("key", "confirmed");
        assert_eq!(record.get_str("key"), Some("confirmed"));
    }

    #[test]
    fn test_set_item_attribute_preserves_insertion_order() {
        let mut record = AttributeRecord::new();
        record.set_item_attribute("brand", "Acme");
        record.set_item_attribute("brand_wikidata", "Q1");

        let keys: Vec<&String> = record
            .get("item_attributes")
            .and_then(Value::as_object)
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, ["brand", "brand_wikidata"]);
    }

    #[test]
    fn test_strip_private() {
        let mut record = AttributeRecord::from([
            ("_pending_scripts", json!(["https://a.example/app.js"])),
            ("key", json!("woos-1")),
        ]);
        record.strip_private();
        assert_eq!(record.keys().collect::<Vec<_>>(), ["key"]);
    }

    #[test]
    fn test_serde_round_trip_is_transparent() {
        let record = AttributeRecord::from([("key", json!("u1"))]);
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"key":"u1"}"#);
    }

    #[test]
    fn test_deserialize_drops_null_values() {
        let record: AttributeRecord =
            serde_json::from_str(r#"{"name": "acme", "brand": null, "key": "u1"}"#).unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), ["name", "key"]);
        assert!(record.get("brand").is_none());
    }
}
