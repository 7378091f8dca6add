//! Shared ingress middleware

use crate::types::RequestId;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Uri, header, uri::PathAndQuery},
    middleware::Next,
    response::Response,
};
use bizosaas_egress::upstream::TENANT_DOMAIN_HEADER;
use bizosaas_routing::HostTable;
use std::sync::Arc;
use tracing::{debug, warn};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const PLATFORM_TYPE_HEADER: &str = "x-platform-type";

/// Attach a request id, client-supplied or generated
///
/// The id is written back onto the request so it is forwarded upstream.
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::from_header)
        .unwrap_or_else(RequestId::generate);

    let header_value = HeaderValue::from_str(request_id.as_str()).ok();
    if let Some(value) = &header_value {
        req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let mut response = next.run(req).await;

    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Resolve the tenant from `Host` and land `/` on the tenant's root path
///
/// Must wrap the router from outside so the rewritten path is what gets
/// routed. A client-supplied `x-tenant-domain` is dropped; known hosts get
/// it on the request and response. Every response gets `x-platform-type`.
pub async fn tenant_routing_middleware(
    State(hosts): State<Arc<HostTable>>,
    mut req: Request,
    next: Next,
) -> Response {
    // Only the gateway decides the tenant
    req.headers_mut().remove(TENANT_DOMAIN_HEADER);

    let host = request_host(&req);
    let route = host.as_deref().and_then(|h| hosts.lookup(h)).cloned();

    if let (Some(route), Some(host)) = (&route, &host) {
        if req.uri().path() == "/" && route.root_path != "/" {
            match rewrite_path(req.uri(), &route.root_path) {
                Some(uri) => {
                    debug!(host = %host, to = %uri, "Rewriting tenant root");
                    *req.uri_mut() = uri;
                }
                None => warn!(host = %host, root_path = %route.root_path, "Invalid tenant root path"),
            }
        }
        if let Ok(value) = HeaderValue::from_str(host) {
            req.headers_mut().insert(TENANT_DOMAIN_HEADER, value);
        }
    }

    let mut response = next.run(req).await;

    let platform = route.as_ref().map(|r| r.platform_type).unwrap_or_default();
    response.headers_mut().insert(
        PLATFORM_TYPE_HEADER,
        HeaderValue::from_static(platform.as_str()),
    );
    if route.is_some()
        && let Some(value) = host.as_deref().and_then(|h| HeaderValue::from_str(h).ok())
    {
        response.headers_mut().insert(TENANT_DOMAIN_HEADER, value);
    }
    response
}

fn request_host(req: &Request) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
}

/// Replace the path of `uri`, keeping its query string
fn rewrite_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}
