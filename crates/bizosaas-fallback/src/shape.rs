//! Declared payload shapes
//!
//! A shape is a list of required fields addressed by dotted path
//! (`homepage.title`). It is checked against every fixture in tests and
//! against live upstream payloads to spot contract drift.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    String,
    Number,
    Bool,
    Array,
    Object,
    /// Any non-null value
    Any,
}

impl JsonKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonKind::String => value.is_string(),
            JsonKind::Number => value.is_number(),
            JsonKind::Bool => value.is_boolean(),
            JsonKind::Array => value.is_array(),
            JsonKind::Object => value.is_object(),
            JsonKind::Any => !value.is_null(),
        }
    }

    fn of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// A field that is missing or has the wrong kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeViolation {
    pub path: String,
    pub expected: JsonKind,
    /// `None` when the field is missing
    pub found: Option<&'static str>,
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(found) => write!(f, "{}: expected {:?}, found {}", self.path, self.expected, found),
            None => write!(f, "{}: missing", self.path),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureShape {
    fields: Vec<(String, JsonKind)>,
}

impl FixtureShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a field at a dotted path
    pub fn field(mut self, path: impl Into<String>, kind: JsonKind) -> Self {
        self.fields.push((path.into(), kind));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, JsonKind)> {
        self.fields.iter().map(|(p, k)| (p.as_str(), *k))
    }

    pub fn violations(&self, value: &Value) -> Vec<ShapeViolation> {
        self.fields
            .iter()
            .filter_map(|(path, kind)| match lookup(value, path) {
                Some(found) if kind.matches(found) => None,
                Some(found) => Some(ShapeViolation {
                    path: path.clone(),
                    expected: *kind,
                    found: Some(JsonKind::of(found)),
                }),
                None => Some(ShapeViolation {
                    path: path.clone(),
                    expected: *kind,
                    found: None,
                }),
            })
            .collect()
    }

    pub fn validate(&self, value: &Value) -> std::result::Result<(), Vec<ShapeViolation>> {
        let violations = self.violations(value);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Paths a live payload lacks compared with this shape
    pub fn drift(&self, value: &Value) -> Vec<String> {
        self.violations(value).into_iter().map(|v| v.path).collect()
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn homepage_shape() -> FixtureShape {
        FixtureShape::new()
            .field("homepage", JsonKind::Object)
            .field("homepage.title", JsonKind::String)
            .field("sections", JsonKind::Array)
    }

    #[test]
    fn test_valid_payload() {
        let payload = json!({"homepage": {"title": "Hi"}, "sections": []});
        assert!(homepage_shape().validate(&payload).is_ok());
    }

    #[test]
    fn test_missing_nested_field() {
        let payload = json!({"homepage": {}, "sections": []});
        let violations = homepage_shape().validate(&payload).unwrap_err();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "homepage.title");
        assert_eq!(violations[0].found, None);
        assert_eq!(violations[0].to_string(), "homepage.title: missing");
    }

    #[test]
    fn test_wrong_kind() {
        let payload = json!({"homepage": {"title": 5}, "sections": {}});
        let violations = homepage_shape().violations(&payload);

        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].found, Some("number"));
        assert_eq!(violations[1].path, "sections");
    }

    #[test]
    fn test_any_rejects_null() {
        let shape = FixtureShape::new().field("data", JsonKind::Any);
        assert!(shape.validate(&json!({"data": null})).is_err());
        assert!(shape.validate(&json!({"data": 0})).is_ok());
    }

    #[test]
    fn test_drift_lists_paths() {
        let drift = homepage_shape().drift(&json!({"page": {}}));
        assert_eq!(drift, vec!["homepage", "homepage.title", "sections"]);
    }
}
