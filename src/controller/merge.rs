//! # Merge
//!
//! Folds a synthesized object into the one read from the cluster so fields the
//! operator does not own survive (admission-injected sidecars, server defaults).
//!
//! Rules, applied on the JSON form:
//! - objects merge key by key; a key absent or `null` in desired keeps the existing value
//! - lists of named objects merge element-wise by key; membership and order follow desired
//! - a volume or env var whose top-level shape changed (e.g. `emptyDir` to
//!   `persistentVolumeClaim`) is taken from desired as is, so one-of fields never end up doubled
//! - every other list, and every scalar, is replaced by desired

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Merge `desired` into `existing` and read the result back as `T`
pub fn merge_into<T>(existing: &T, desired: &T) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    let merged = merge_value(
        None,
        serde_json::to_value(existing)?,
        serde_json::to_value(desired)?,
    );
    serde_json::from_value(merged)
}

/// Key identifying an element of the list stored under `field`
fn list_key(field: Option<&str>) -> &'static str {
    match field {
        Some("volumeMounts") => "mountPath",
        _ => "name",
    }
}

/// Lists whose elements carry exactly one source field
fn is_one_of_list(field: Option<&str>) -> bool {
    matches!(field, Some("volumes" | "env"))
}

fn merge_value(field: Option<&str>, existing: Value, desired: Value) -> Value {
    match (existing, desired) {
        (Value::Object(existing), Value::Object(desired)) => {
            Value::Object(merge_object(existing, desired))
        }
        (Value::Array(existing), Value::Array(desired)) => {
            Value::Array(merge_list(field, existing, desired))
        }
        (existing, Value::Null) => existing,
        (_, desired) => desired,
    }
}

fn merge_object(mut existing: Map<String, Value>, desired: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in desired {
        if value.is_null() {
            continue;
        }
        let current = existing.remove(&key).unwrap_or(Value::Null);
        let merged = merge_value(Some(key.as_str()), current, value);
        existing.insert(key, merged);
    }
    existing
}

fn element_key<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn same_shape(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len() && a.keys().all(|k| b.contains_key(k))
}

fn merge_list(field: Option<&str>, mut existing: Vec<Value>, desired: Vec<Value>) -> Vec<Value> {
    let key = list_key(field);
    let one_of = is_one_of_list(field);
    if desired.is_empty() || !desired.iter().all(|v| element_key(v, key).is_some()) {
        return desired;
    }

    desired
        .into_iter()
        .map(|wanted| {
            let id = element_key(&wanted, key).map(str::to_string);
            let position = existing
                .iter()
                .position(|current| element_key(current, key).map(str::to_string) == id);
            match position.map(|i| existing.remove(i)) {
                Some(Value::Object(current)) => match wanted {
                    Value::Object(wanted) if !one_of || same_shape(&current, &wanted) => {
                        Value::Object(merge_object(current, wanted))
                    }
                    wanted => wanted,
                },
                _ => wanted,
            }
        })
        .collect()
}
