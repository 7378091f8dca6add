//! Tenant types for multi-tenancy support

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Identifier of a tenant as issued by the upstream services.
///
/// Upstreams use both UUIDs and slugs, so the id is kept as an opaque
/// string restricted to `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidTenant("Tenant ID is empty".to_string()));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::InvalidTenant(format!(
                "Invalid tenant ID format: {}",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_string(&value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Read-only view of a tenant's dashboard, fetched per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub tenant_name: String,
    #[serde(default)]
    pub industry: Option<String>,
    /// Free-form KPI map; keys are defined by the Brain Gateway
    #[serde(default)]
    pub metrics: Map<String, Value>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub recent_activity: Vec<ActivityItem>,
    #[serde(default)]
    pub ai_insights: Vec<AiInsight>,
}

impl TenantContext {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiInsight {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: Option<String>,
}

/// Tenant entry as listed for a signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantSummary {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}
