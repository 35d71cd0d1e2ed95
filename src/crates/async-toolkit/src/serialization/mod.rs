//! Argument serialization for cache keys
//!
//! Cache keys are built from the serialized call arguments. Two encodings
//! are available: the plain `serde_json` output, whose object key order
//! follows the value's own field or insertion order (`serde_json` is built
//! with `preserve_order`), and a canonical form with every object's keys
//! sorted.

use crate::Result;
use serde::Serialize;
use serde_json::Value;

/// Serialize a value to compact JSON exactly as `serde_json` emits it
///
/// Field order follows the type's declaration (or a map's insertion
/// order), so structurally equal values can yield different strings.
pub fn to_json_key<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Serialize a JSON value with every object's keys in sorted order
///
/// ```rust
/// use async_toolkit::serialization::stable_json_string;
/// use serde_json::json;
///
/// let args = json!({"page": 2, "filter": {"tag": "events", "author": "ada"}});
/// assert_eq!(
///     stable_json_string(&args).unwrap(),
///     r#"{"filter":{"author":"ada","tag":"events"},"page":2}"#
/// );
/// ```
pub fn stable_json_string(value: &Value) -> Result<String> {
    let mut sorted = value.clone();
    sort_keys(&mut sorted);
    Ok(serde_json::to_string(&sorted)?)
}

/// Serialize any value to its canonical (key-sorted) JSON string
pub fn to_stable_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_value(value)?;
    sort_keys(&mut json);
    Ok(serde_json::to_string(&json)?)
}

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, mut inner) in entries {
                sort_keys(&mut inner);
                map.insert(key, inner);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct NameFirst {
        name: &'static str,
        age: u8,
    }

    #[derive(Serialize)]
    struct AgeFirst {
        age: u8,
        name: &'static str,
    }

    #[test]
    fn test_json_key_follows_field_order() {
        let a = to_json_key(&NameFirst { name: "ada", age: 36 }).unwrap();
        let b = to_json_key(&AgeFirst { age: 36, name: "ada" }).unwrap();
        assert_eq!(a, r#"{"name":"ada","age":36}"#);
        assert_ne!(a, b);
    }

    #[test]
    fn test_stable_json_ignores_field_order() {
        let a = to_stable_json(&NameFirst { name: "ada", age: 36 }).unwrap();
        let b = to_stable_json(&AgeFirst { age: 36, name: "ada" }).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, r#"{"age":36,"name":"ada"}"#);
    }

    #[test]
    fn test_stable_json_nested_arrays() {
        let value = json!([{"b": 1, "a": [{"d": 4, "c": 3}]}]);
        assert_eq!(
            stable_json_string(&value).unwrap(),
            r#"[{"a":[{"c":3,"d":4}],"b":1}]"#
        );
    }

    #[test]
    fn test_tuple_arguments() {
        assert_eq!(to_json_key(&("posts", 3)).unwrap(), r#"["posts",3]"#);
        assert_eq!(to_stable_json(&("posts", 3)).unwrap(), r#"["posts",3]"#);
    }

    #[test]
    fn test_value_keys_keep_insertion_order() {
        let mut map = serde_json::Map::new();
        map.insert("zone".to_string(), json!("eu"));
        map.insert("id".to_string(), json!(4));
        let value = Value::Object(map);

        assert_eq!(to_json_key(&value).unwrap(), r#"{"zone":"eu","id":4}"#);
        assert_eq!(to_stable_json(&value).unwrap(), r#"{"id":4,"zone":"eu"}"#);
    }
}
