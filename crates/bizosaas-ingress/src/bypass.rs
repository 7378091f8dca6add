//! Frontend bypass for paths the gateway does not route
//!
//! Requests are forwarded verbatim to the Next.js app, including the
//! tenant root paths the host middleware rewrote `/` to. Without a
//! frontend upstream, unmatched paths are a JSON 404.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use bizosaas_egress::UpstreamClient;
use bizosaas_egress::upstream::FORWARDED_HOST_HEADER;
use std::time::Instant;
use tracing::{debug, warn};

use crate::state::GatewayState;
use crate::types::IngressError;

/// Largest request body forwarded to the frontend
pub const MAX_BYPASS_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum BypassError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

pub async fn frontend_fallback(State(state): State<GatewayState>, req: Request) -> Response {
    let path = req.uri().path().to_string();

    let Some(frontend) = &state.upstreams.frontend else {
        debug!("No route for {}", path);
        return IngressError::NotFound(format!("No route for {}", path)).into_response();
    };

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or(path);
    let (parts, body) = req.into_parts();

    let body = match axum::body::to_bytes(body, MAX_BYPASS_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return IngressError::InvalidRequest(format!("Failed to read request body: {}", e))
                .into_response();
        }
    };

    let started = Instant::now();
    let result = proxy_request(frontend, &path_and_query, parts.method, parts.headers, body).await;
    let failure = result.as_ref().err().map(|_| "network_error");
    state.observe_upstream(frontend.name(), failure, started.elapsed().as_secs_f64());

    match result {
        Ok(response) => response,
        Err(e) => {
            warn!(upstream = frontend.name(), "Frontend proxy failed: {}", e);
            IngressError::UpstreamUnavailable(frontend.name().to_string()).into_response()
        }
    }
}

/// Forward a request to `upstream`, preserving status, headers and body
pub async fn proxy_request(
    upstream: &UpstreamClient,
    path_and_query: &str,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BypassError> {
    let url = format!("{}{}", upstream.base_url(), path_and_query);
    debug!("Bypass proxy: {} {} -> {}", method, path_and_query, url);

    let original_host = headers.get(axum::http::header::HOST).cloned();
    let mut request_headers = filter_headers(&headers);
    request_headers.remove(axum::http::header::HOST);
    if let Some(host) = original_host {
        request_headers.insert(FORWARDED_HOST_HEADER, host);
    }

    let response = upstream
        .http()
        .request(method, &url)
        .headers(request_headers)
        .timeout(upstream.timeout())
        .body(body)
        .send()
        .await?;

    let status = response.status();
    let response_headers = filter_headers(response.headers());
    let response_bytes = response.bytes().await?;

    debug!(
        "Bypass proxy response: {} bytes, status: {}",
        response_bytes.len(),
        status
    );

    let mut response = Response::new(Body::from(response_bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !is_hop_by_hop_header(name.as_str()) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Check if a header is a hop-by-hop header that should not be forwarded
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
            | "content-length"
    )
}
