//! Management resource addresses.

use serde_json::{Map, Value};
use std::fmt;

/// Path of a resource in the management model, e.g.
/// `/subsystem=logging/logger=com.foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(Vec<(String, String)>);

impl Address {
    /// Value that matches every child of a type.
    pub const WILDCARD: &'static str = "*";

    /// The root resource.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Appends one `key=value` segment.
    #[must_use]
    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[(String, String)] {
        &self.0
    }

    /// Returns true for the root resource.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Key of the last segment.
    #[must_use]
    pub fn last_key(&self) -> Option<&str> {
        self.0.last().map(|(key, _)| key.as_str())
    }

    /// Value of the last segment.
    #[must_use]
    pub fn last_value(&self) -> Option<&str> {
        self.0.last().map(|(_, value)| value.as_str())
    }

    /// The management JSON form: a list of single-entry objects.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|(key, value)| {
                    let mut segment = Map::new();
                    segment.insert(key.clone(), Value::String(value.clone()));
                    Value::Object(segment)
                })
                .collect(),
        )
    }

    /// Parses the management JSON form.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let mut segments = Vec::new();
        for segment in value.as_array()? {
            let (key, value) = segment.as_object()?.iter().next()?;
            segments.push((key.clone(), value.as_str()?.to_string()));
        }
        Some(Self(segments))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for (key, value) in &self.0 {
            write!(f, "/{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let address = Address::root().and("subsystem", "logging").and("logger", "com.foo");
        let json = address.to_json();
        assert_eq!(json, serde_json::json!([{"subsystem": "logging"}, {"logger": "com.foo"}]));
        assert_eq!(Address::from_json(&json), Some(address));
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::root().to_string(), "/");
        assert_eq!(Address::root().and("deployment", "foo.war").to_string(), "/deployment=foo.war");
    }
}
