//! End-to-end test harness for the BizOSaaS gateway
//!
//! Wires the full gateway router to mocked (or unreachable) upstreams and
//! drives it with `tower::ServiceExt::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use bizosaas_egress::{HttpClientConfig, UpstreamClient};
use bizosaas_fallback::FallbackCatalog;
use bizosaas_ingress::{GatewayState, Upstreams, gateway_router};
use bizosaas_observability::Metrics;
use bizosaas_routing::{HostTable, RouteTable};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Address nothing listens on; connections are refused immediately
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

/// Response as seen by a client
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Builder for a gateway under test
pub struct TestGateway {
    brain_url: String,
    auth_url: String,
    frontend_url: Option<String>,
    routes: RouteTable,
    hosts: HostTable,
    timeout_ms: u64,
}

impl TestGateway {
    pub fn new(brain_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        Self {
            brain_url: brain_url.into(),
            auth_url: auth_url.into(),
            frontend_url: None,
            routes: RouteTable::with_defaults(),
            hosts: HostTable::with_defaults(),
            timeout_ms: 1_000,
        }
    }

    /// Both upstreams unreachable
    pub fn offline() -> Self {
        Self::new(UNREACHABLE, UNREACHABLE)
    }

    pub fn with_frontend(mut self, url: impl Into<String>) -> Self {
        self.frontend_url = Some(url.into());
        self
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn state(self) -> GatewayState {
        let config = HttpClientConfig {
            timeout_ms: self.timeout_ms,
            connect_timeout_ms: self.timeout_ms,
            ..HttpClientConfig::default()
        };
        let client = |name: &str, url: &str| {
            UpstreamClient::new(name, url, &config).expect("valid test upstream URL")
        };

        let mut upstreams = Upstreams::new(
            client("brain", &self.brain_url),
            client("auth", &self.auth_url),
        );
        if let Some(url) = &self.frontend_url {
            upstreams = upstreams.with_frontend(client("frontend", url));
        }

        GatewayState::new(
            self.routes,
            self.hosts,
            FallbackCatalog::with_builtin(),
            upstreams,
            Arc::new(Metrics::new().expect("metrics registry")),
        )
    }

    pub fn router(self) -> Router {
        gateway_router(self.state())
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    let text = String::from_utf8_lossy(&bytes).to_string();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
        text,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}
