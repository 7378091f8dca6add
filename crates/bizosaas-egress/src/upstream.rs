//! Upstream client shared by every proxy route
//!
//! One `UpstreamClient` exists per configured backend. It owns the pooled
//! HTTP client, the base URL and the timeout, so route handlers only
//! describe *what* to send.

use crate::client::{HttpClientConfig, create_client, with_retry};
use crate::{EgressError, Result};
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Header carrying the tenant host to the upstream
pub const TENANT_DOMAIN_HEADER: &str = "x-tenant-domain";
/// Header carrying the original inbound host to the upstream
pub const FORWARDED_HOST_HEADER: &str = "x-forwarded-host";

/// Inbound headers that are forwarded to the upstream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardHeaders {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    /// Inbound `Host`, used by the upstream for tenant resolution.
    /// `x-tenant-domain` is only consulted without a `Host`, and the
    /// ingress middleware strips any client-supplied value.
    pub tenant_host: Option<String>,
    pub request_id: Option<String>,
}

impl ForwardHeaders {
    /// Collect the forwardable headers from an inbound request
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        Self {
            authorization: get(header::AUTHORIZATION.as_str()),
            cookie: get(header::COOKIE.as_str()),
            tenant_host: get(header::HOST.as_str()).or_else(|| get(TENANT_DOMAIN_HEADER)),
            request_id: get("x-request-id"),
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn with_tenant_host(mut self, host: impl Into<String>) -> Self {
        self.tenant_host = Some(host.into());
        self
    }
}

/// Request to an upstream, relative to its base URL
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub headers: ForwardHeaders,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: ForwardHeaders::default(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn with_headers(mut self, headers: ForwardHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful (2xx) upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Decoded JSON body; `Null` for empty bodies
    pub body: Value,
}

/// Client bound to one backend base URL
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    name: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl UpstreamClient {
    /// Create an upstream client with its own connection pool
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        config: &HttpClientConfig,
    ) -> Result<Self> {
        let client = create_client(config)?;
        Self::with_client(name, base_url, client, config)
    }

    /// Create an upstream client sharing an existing connection pool
    pub fn with_client(
        name: impl Into<String>,
        base_url: impl Into<String>,
        client: Client,
        config: &HttpClientConfig,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EgressError::ConfigError(format!(
                "Upstream base URL must be http(s): '{}'",
                base_url
            )));
        }

        Ok(Self {
            name: name.into(),
            base_url,
            client,
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying pooled client, for raw passthrough
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build `${BASE_URL}${path}[?query]`
    pub fn url_for(&self, path: &str, query: Option<&str>) -> String {
        let path = path.trim_start_matches('/');
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}/{}?{}", self.base_url, path, q),
            None => format!("{}/{}", self.base_url, path),
        }
    }

    /// Send a JSON request. Non-2xx answers come back as
    /// [`EgressError::Status`] with the decoded body when there is one.
    ///
    /// Only `GET` requests are retried.
    pub async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        if request.method == Method::GET && self.max_retries > 0 {
            with_retry(self.max_retries, || self.send_once(request)).await
        } else {
            self.send_once(request).await
        }
    }

    async fn send_once(&self, request: &UpstreamRequest) -> Result<UpstreamResponse> {
        let url = self.url_for(&request.path, request.query.as_deref());
        let started = Instant::now();

        debug!(
            upstream = %self.name,
            method = %request.method,
            url = %url,
            "Sending upstream request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .timeout(self.timeout)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );

        let headers = &request.headers;
        if let Some(auth) = &headers.authorization {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        if let Some(cookie) = &headers.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(host) = &headers.tenant_host {
            builder = builder
                .header(FORWARDED_HOST_HEADER, host)
                .header(TENANT_DOMAIN_HEADER, host);
        }
        if let Some(request_id) = &headers.request_id {
            builder = builder.header("x-request-id", request_id);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body).map_err(|e| {
                EgressError::ConfigError(format!("Failed to encode request body: {}", e))
            })?);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        debug!(
            upstream = %self.name,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        if !status.is_success() {
            return Err(EgressError::Status {
                status: status.as_u16(),
                body: serde_json::from_slice(&bytes).ok(),
            });
        }

        let body = decode_body(&bytes)?;
        Ok(UpstreamResponse { status, body })
    }

    fn map_send_error(&self, error: reqwest::Error) -> EgressError {
        if error.is_timeout() {
            EgressError::Timeout(self.timeout.as_millis() as u64)
        } else {
            EgressError::HttpError(error)
        }
    }
}

fn decode_body(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| EgressError::Decode(e.to_string()))
}
