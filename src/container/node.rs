//! Accessors for attribute values in read-resource results.

use indexmap::IndexMap;
use serde_json::Value;

/// A string attribute. Numbers and booleans are rendered; undefined is `None`.
pub fn string(node: &Value, name: &str) -> Option<String> {
    match node.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("EXPRESSION_VALUE").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// An unsigned integer attribute.
pub fn number(node: &Value, name: &str) -> Option<u32> {
    match node.get(name)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// A boolean attribute.
pub fn boolean(node: &Value, name: &str) -> Option<bool> {
    match node.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// A list of strings attribute; undefined is empty.
pub fn string_list(node: &Value, name: &str) -> Vec<String> {
    node.get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// A map of strings attribute; undefined is empty.
pub fn string_map(node: &Value, name: &str) -> IndexMap<String, String> {
    node.get(name)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(key, value)| match value {
                    Value::String(s) => Some((key.clone(), s.clone())),
                    Value::Number(n) => Some((key.clone(), n.to_string())),
                    Value::Bool(b) => Some((key.clone(), b.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let node = json!({
            "level": "INFO",
            "max-pool-size": 20,
            "enabled": true,
            "handlers": ["A", "B"],
            "properties": {"port": 514, "host": "localhost"},
            "encoding": null
        });
        assert_eq!(string(&node, "level").as_deref(), Some("INFO"));
        assert_eq!(string(&node, "encoding"), None);
        assert_eq!(number(&node, "max-pool-size"), Some(20));
        assert_eq!(boolean(&node, "enabled"), Some(true));
        assert_eq!(string_list(&node, "handlers"), vec!["A", "B"]);
        assert_eq!(string_map(&node, "properties")["port"], "514");
        assert!(string_list(&node, "missing").is_empty());
    }
}
