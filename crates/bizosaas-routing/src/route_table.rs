//! Proxy route table
//!
//! Each `/api/brain/<domain>/<resource>` request resolves to a `RouteSpec`
//! keyed by method and `<domain>/<resource>`. Keys that are not in the
//! table still proxy to the Brain Gateway, but without a fallback.

use bizosaas_core::Source;
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{Result, RoutingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RouteMethod {
    pub fn from_http(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(RouteMethod::Get),
            Method::POST => Some(RouteMethod::Post),
            Method::PUT => Some(RouteMethod::Put),
            Method::PATCH => Some(RouteMethod::Patch),
            Method::DELETE => Some(RouteMethod::Delete),
            _ => None,
        }
    }

    pub fn as_http(&self) -> Method {
        match self {
            RouteMethod::Get => Method::GET,
            RouteMethod::Post => Method::POST,
            RouteMethod::Put => Method::PUT,
            RouteMethod::Patch => Method::PATCH,
            RouteMethod::Delete => Method::DELETE,
        }
    }

    /// Whether requests with this method carry a JSON body
    pub fn has_body(&self) -> bool {
        !matches!(self, RouteMethod::Get)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_http())
    }
}

/// Which configured upstream a route talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamKind {
    #[default]
    Brain,
    Auth,
}

impl UpstreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamKind::Brain => "brain",
            UpstreamKind::Auth => "auth",
        }
    }

    /// Envelope tag for live responses from this upstream
    pub fn source(&self) -> Source {
        match self {
            UpstreamKind::Brain => Source::BrainGateway,
            UpstreamKind::Auth => Source::AuthService,
        }
    }
}

/// What a route does when its upstream is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Serve the fallback fixture with HTTP 200, flagged as degraded
    #[default]
    Degrade,
    /// Answer 502; used where stale data would mislead (billing, orders)
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// `<domain>/<resource>`, e.g. `wagtail/homepage`
    pub key: String,
    pub method: RouteMethod,
    #[serde(default)]
    pub upstream: UpstreamKind,
    /// Path on the upstream; defaults to `/api/brain/<key>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_path: Option<String>,
    /// Fallback fixture name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default)]
    pub policy: FallbackPolicy,
    /// Top-level body fields that must be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

impl RouteSpec {
    pub fn new(method: RouteMethod, key: impl Into<String>) -> Self {
        Self {
            key: normalize_key(&key.into()),
            method,
            upstream: UpstreamKind::Brain,
            upstream_path: None,
            fallback: None,
            policy: FallbackPolicy::Fail,
            required_fields: Vec::new(),
        }
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::new(RouteMethod::Get, key)
    }

    pub fn post(key: impl Into<String>) -> Self {
        Self::new(RouteMethod::Post, key)
    }

    /// Serve `fixture` with the degrade policy
    pub fn with_fallback(mut self, fixture: impl Into<String>) -> Self {
        self.fallback = Some(fixture.into());
        self.policy = FallbackPolicy::Degrade;
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_upstream_path(mut self, path: impl Into<String>) -> Self {
        self.upstream_path = Some(path.into());
        self
    }

    pub fn with_required_fields(mut self, fields: &[&str]) -> Self {
        self.required_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Path sent to the upstream
    pub fn upstream_path(&self) -> String {
        match &self.upstream_path {
            Some(path) => path.clone(),
            None => format!("/api/brain/{}", self.key),
        }
    }

    /// Fixture to serve on upstream failure, if the policy allows one
    pub fn degraded_fixture(&self) -> Option<&str> {
        match self.policy {
            FallbackPolicy::Degrade => self.fallback.as_deref(),
            FallbackPolicy::Fail => None,
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| RoutingError::InvalidRoute {
            key: self.key.clone(),
            reason: reason.to_string(),
        };

        validate_key(&self.key)?;
        if let Some(path) = &self.upstream_path
            && !path.starts_with('/')
        {
            return Err(invalid("upstream_path must start with '/'"));
        }
        if !self.method.has_body() && !self.required_fields.is_empty() {
            return Err(invalid("required_fields need a method with a body"));
        }
        Ok(())
    }
}

/// Keys become upstream path segments verbatim, so each segment is limited
/// to unreserved URL characters and may not be `.` or `..`
fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason: &str| RoutingError::InvalidRoute {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("key must look like <domain>/<resource>"));
    }
    if segments.iter().any(|s| *s == ".." || *s == ".") {
        return Err(invalid("key must not contain relative segments"));
    }
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
    if !segments.iter().all(|s| s.chars().all(unreserved)) {
        return Err(invalid("key segments may only use [A-Za-z0-9-._~]"));
    }
    Ok(())
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_matches('/').to_string()
}

/// Route specs keyed by method and `<domain>/<resource>`
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(RouteMethod, String), RouteSpec>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in routes of the BizOSaaS frontends
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for spec in default_routes() {
            table.routes.insert((spec.method, spec.key.clone()), spec);
        }
        table
    }

    /// Add or replace a route
    pub fn insert(&mut self, mut spec: RouteSpec) -> Result<()> {
        spec.key = normalize_key(&spec.key);
        spec.validate()?;
        self.routes.insert((spec.method, spec.key.clone()), spec);
        Ok(())
    }

    /// Merge routes from configuration, replacing built-ins with the same key
    pub fn extend(&mut self, specs: impl IntoIterator<Item = RouteSpec>) -> Result<()> {
        for spec in specs {
            self.insert(spec)?;
        }
        Ok(())
    }

    pub fn lookup(&self, method: RouteMethod, key: &str) -> Option<&RouteSpec> {
        self.routes.get(&(method, normalize_key(key)))
    }

    /// Spec for a request; unknown keys proxy to Brain with no fallback
    ///
    /// Unknown keys come straight from the request path and are validated
    /// like configured ones, so they cannot leave `/api/brain/`.
    pub fn resolve(&self, method: RouteMethod, key: &str) -> Result<RouteSpec> {
        if let Some(spec) = self.lookup(method, key) {
            return Ok(spec.clone());
        }
        let spec = RouteSpec::new(method, key);
        validate_key(&spec.key)?;
        Ok(spec)
    }

    /// Fixture names referenced by any route
    pub fn fallback_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .routes
            .values()
            .filter_map(|r| r.fallback.as_deref())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Routes sorted by key then method
    pub fn routes(&self) -> Vec<&RouteSpec> {
        let mut routes: Vec<&RouteSpec> = self.routes.values().collect();
        routes.sort_by(|a, b| a.key.cmp(&b.key).then(a.method.to_string().cmp(&b.method.to_string())));
        routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn default_routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec::get("wagtail/homepage").with_fallback("wagtail.homepage"),
        RouteSpec::get("tenant/dashboard").with_fallback("tenant.dashboard"),
        RouteSpec::get("saleor/products").with_fallback("saleor.products"),
        // Billing data must never be faked
        RouteSpec::get("billing/invoices")
            .with_fallback("billing.invoices")
            .with_policy(FallbackPolicy::Fail),
        RouteSpec::get("security/events").with_fallback("security.events"),
        RouteSpec::get("crm/leads").with_fallback("crm.leads"),
        RouteSpec::post("crm/leads").with_required_fields(&["email", "first_name"]),
        RouteSpec::get("gamification/leaderboard").with_fallback("gamification.leaderboard"),
        RouteSpec::post("gamification/referrals/generate-code")
            .with_fallback("gamification.referral_code"),
        RouteSpec::get("directory/businesses").with_fallback("directory.businesses"),
    ]
}
