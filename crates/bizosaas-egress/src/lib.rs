//! BizOSaaS Egress
//!
//! This crate provides the clients used to reach the backend services the
//! gateway fronts (Brain Gateway, auth service, frontend app):
//! - Pooled HTTP client construction and retry helper
//! - `UpstreamClient`, one per configured backend base URL

pub mod client;
pub mod upstream;

pub use client::{HttpClientConfig, create_client, with_retry};
pub use upstream::{ForwardHeaders, UpstreamClient, UpstreamRequest, UpstreamResponse};

use thiserror::Error;

/// Errors raised while talking to an upstream
#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Upstream returned status {status}")]
    Status {
        status: u16,
        body: Option<serde_json::Value>,
    },

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl EgressError {
    /// Upstream HTTP status, if the upstream answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            EgressError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the upstream could not be reached or answered with a
    /// server error. These are the failures a fallback may stand in for.
    pub fn is_unavailable(&self) -> bool {
        match self {
            EgressError::HttpError(_) | EgressError::Timeout(_) | EgressError::Decode(_) => true,
            EgressError::Status { status, .. } => *status >= 500,
            EgressError::ConfigError(_) => false,
        }
    }

    /// Human readable message from an upstream error body.
    ///
    /// Looks at `detail`, `error` (string or `{message}`) and `message`, in
    /// that order.
    pub fn detail_message(&self) -> Option<String> {
        match self {
            EgressError::Status {
                body: Some(body), ..
            } => extract_detail(body),
            _ => None,
        }
    }

    /// Short label used in logs, metrics and the `x-bizosaas-fallback` header
    pub fn reason(&self) -> &'static str {
        match self {
            EgressError::HttpError(e) if e.is_connect() => "connect_error",
            EgressError::HttpError(e) if e.is_timeout() => "timeout",
            EgressError::HttpError(_) => "network_error",
            EgressError::Timeout(_) => "timeout",
            EgressError::Status { .. } => "upstream_status",
            EgressError::Decode(_) => "invalid_body",
            EgressError::ConfigError(_) => "config_error",
        }
    }
}

/// Pull an error message out of a JSON error body
pub fn extract_detail(body: &serde_json::Value) -> Option<String> {
    if let Some(detail) = body.get("detail") {
        if let Some(s) = detail.as_str() {
            return Some(s.to_string());
        }
        // FastAPI validation errors: [{"msg": "..."}]
        if let Some(first) = detail.as_array().and_then(|a| a.first())
            && let Some(msg) = first.get("msg").and_then(|m| m.as_str())
        {
            return Some(msg.to_string());
        }
    }

    match body.get("error") {
        Some(serde_json::Value::String(s)) => return Some(s.clone()),
        Some(err) => {
            if let Some(msg) = err.get("message").and_then(|m| m.as_str()) {
                return Some(msg.to_string());
            }
        }
        None => {}
    }

    body.get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

pub type Result<T> = std::result::Result<T, EgressError>;
