//! Fallback payload generators

use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::{Value, json};

use crate::shape::{FixtureShape, JsonKind};

/// Request details available to a generator
#[derive(Debug, Clone, Default)]
pub struct FallbackContext {
    /// Inbound tenant host (`Host` / `x-tenant-domain`)
    pub tenant_host: Option<String>,
    /// Raw inbound query string
    pub query: Option<String>,
    /// Parsed inbound JSON body
    pub body: Option<Value>,
}

impl FallbackContext {
    pub fn with_tenant_host(mut self, host: impl Into<String>) -> Self {
        self.tenant_host = Some(host.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Produces the payload for one named fallback
pub trait FallbackGenerator: Send + Sync {
    /// Shape every generated payload satisfies
    fn shape(&self) -> &FixtureShape;

    fn generate(&self, ctx: &FallbackContext) -> Value;
}

/// Fixed payload, cloned on every request
#[derive(Debug, Clone)]
pub struct StaticFixture {
    shape: FixtureShape,
    payload: Value,
}

impl StaticFixture {
    pub fn new(shape: FixtureShape, payload: Value) -> Self {
        Self { shape, payload }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

impl FallbackGenerator for StaticFixture {
    fn shape(&self) -> &FixtureShape {
        &self.shape
    }

    fn generate(&self, _ctx: &FallbackContext) -> Value {
        self.payload.clone()
    }
}

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Issues a provisional referral code while the gamification service is down
#[derive(Debug, Clone)]
pub struct ReferralCodeGenerator {
    shape: FixtureShape,
    default_base_url: String,
}

impl ReferralCodeGenerator {
    pub fn new(default_base_url: impl Into<String>) -> Self {
        Self {
            shape: FixtureShape::new()
                .field("referral_code", JsonKind::String)
                .field("tracking_url", JsonKind::String)
                .field("created_at", JsonKind::String),
            default_base_url: default_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `BIZ-XXXX-XXXX` over an unambiguous upper-case alphabet
    pub fn new_code() -> String {
        let mut rng = rand::rng();
        let mut segment = || -> String {
            (0..4)
                .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                .collect()
        };
        let first = segment();
        let second = segment();
        format!("BIZ-{}-{}", first, second)
    }

    fn base_url(&self, ctx: &FallbackContext) -> String {
        match ctx.tenant_host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => format!("https://{}", host),
            _ => self.default_base_url.clone(),
        }
    }
}

impl Default for ReferralCodeGenerator {
    fn default() -> Self {
        Self::new("https://bizoholic.com")
    }
}

impl FallbackGenerator for ReferralCodeGenerator {
    fn shape(&self) -> &FixtureShape {
        &self.shape
    }

    fn generate(&self, ctx: &FallbackContext) -> Value {
        let code = Self::new_code();
        let now = Utc::now();
        let campaign = ctx
            .body
            .as_ref()
            .and_then(|b| b.get("campaign"))
            .and_then(|c| c.as_str())
            .unwrap_or("default");

        json!({
            "referral_code": code,
            "tracking_url": format!("{}/ref/{}", self.base_url(ctx), code),
            "campaign": campaign,
            "created_at": now.to_rfc3339(),
            "expires_at": (now + Duration::days(90)).to_rfc3339(),
            "provisional": true,
        })
    }
}
