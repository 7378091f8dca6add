//! Tagged response envelope shared by every gateway route
//!
//! Upstream payloads and fallback payloads travel in the same envelope so
//! callers never have to guess the shape of a response. The envelope keeps
//! object payloads flat (`{"success": true, "source": "...", "homepage": ...}`)
//! and nests anything else under `data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a response payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Live response from the Brain Gateway (or another business upstream)
    BrainGateway,
    /// Live response from the auth service
    AuthService,
    /// Locally generated fallback payload
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::BrainGateway => "brain_gateway",
            Source::AuthService => "auth_service",
            Source::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response envelope: `success` and `source` tags plus the flattened payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub source: Source,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Wrap a payload. Reserved keys (`success`, `source`) in the payload are
    /// replaced by the envelope's own tags.
    pub fn new(source: Source, payload: Value) -> Self {
        let mut payload = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        payload.remove("success");
        payload.remove("source");

        Self {
            success: true,
            source,
            payload,
        }
    }

    /// Live payload from the Brain Gateway
    pub fn live(payload: Value) -> Self {
        Self::new(Source::BrainGateway, payload)
    }

    /// Locally generated fallback payload
    pub fn fallback(payload: Value) -> Self {
        Self::new(Source::Fallback, payload)
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Source::Fallback
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Add or replace a payload field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "success" && key != "source" {
            self.payload.insert(key, value);
        }
        self
    }

    /// Convert into a plain JSON object
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(self.payload.len() + 2);
        map.insert("success".to_string(), Value::Bool(self.success));
        map.insert(
            "source".to_string(),
            Value::String(self.source.as_str().to_string()),
        );
        map.extend(self.payload);
        Value::Object(map)
    }
}
