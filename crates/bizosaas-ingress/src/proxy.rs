//! Route handler for `/api/brain/{domain}/{*resource}`
//!
//! Resolves a `RouteSpec`, forwards the request to its upstream and, when
//! the upstream is unavailable, applies the route's fallback policy.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bizosaas_core::ResponseEnvelope;
use bizosaas_egress::{EgressError, ForwardHeaders, UpstreamRequest};
use bizosaas_fallback::FallbackContext;
use bizosaas_routing::{RouteMethod, RouteSpec};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::state::GatewayState;
use crate::types::{IngressError, IngressResult};

/// Response header naming why a fallback payload was served
pub const FALLBACK_HEADER: &str = "x-bizosaas-fallback";

/// Metrics label for keys without a configured route
const UNMATCHED_ROUTE: &str = "unmatched";

pub async fn proxy_handler(
    State(state): State<GatewayState>,
    Path((domain, resource)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let key = format!("{}/{}", domain, resource.trim_matches('/'));

    let route_method = RouteMethod::from_http(&method);
    let label = match route_method {
        Some(m) if state.routes.lookup(m, &key).is_some() => key.as_str(),
        _ => UNMATCHED_ROUTE,
    }
    .to_string();

    let response = match route_method {
        Some(m) => match state.routes.resolve(m, &key) {
            Ok(spec) => forward(&state, &spec, method.clone(), &uri, &headers, &body)
                .await
                .unwrap_or_else(IntoResponse::into_response),
            Err(e) => {
                debug!(key = %key, "Rejected route key: {}", e);
                IngressError::InvalidRequest("Invalid resource path".to_string()).into_response()
            }
        },
        None => IngressError::InvalidRequest(format!("Method {} is not supported", method))
            .into_response(),
    };

    state.metrics.record_request(
        &label,
        method.as_str(),
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn forward(
    state: &GatewayState,
    spec: &RouteSpec,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> IngressResult<Response> {
    let json_body = parse_body(spec, body)?;
    let forward_headers = ForwardHeaders::from_header_map(headers);
    let upstream = state.upstreams.for_kind(spec.upstream);

    let mut request = UpstreamRequest::new(method, spec.upstream_path())
        .with_query(uri.query().map(str::to_string))
        .with_headers(forward_headers.clone());
    if let Some(body) = &json_body {
        request = request.with_body(body.clone());
    }

    debug!(
        route = %spec.key,
        upstream = upstream.name(),
        path = %request.path,
        "Proxying request"
    );

    let started = Instant::now();
    let result = upstream.send(&request).await;
    state.observe_egress(upstream.name(), &result, started.elapsed().as_secs_f64());

    match result {
        Ok(response) => {
            warn_on_drift(state, spec, &response.body);
            let envelope = ResponseEnvelope::new(spec.upstream.source(), response.body);
            Ok((response.status, Json(envelope)).into_response())
        }
        Err(err) => {
            let ctx = FallbackContext {
                tenant_host: forward_headers.tenant_host,
                query: request.query,
                body: json_body,
            };
            handle_failure(state, spec, upstream.name(), err, &ctx)
        }
    }
}

/// Decode the body and enforce `required_fields` before any upstream call
fn parse_body(spec: &RouteSpec, body: &Bytes) -> IngressResult<Option<Value>> {
    if !spec.method.has_body() {
        return Ok(None);
    }

    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(serde_json::from_slice::<Value>(body).map_err(|_| {
            IngressError::InvalidRequest("Request body must be valid JSON".to_string())
        })?)
    };

    if spec.required_fields.is_empty() {
        return Ok(parsed);
    }

    let object = parsed.as_ref().and_then(Value::as_object);
    let missing: Vec<String> = spec
        .required_fields
        .iter()
        .filter(|field| {
            object
                .and_then(|o| o.get(field.as_str()))
                .is_none_or(Value::is_null)
        })
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(parsed)
    } else {
        Err(IngressError::MissingFields(missing))
    }
}

fn warn_on_drift(state: &GatewayState, spec: &RouteSpec, body: &Value) {
    let Some(shape) = spec.fallback.as_deref().and_then(|f| state.catalog.shape(f)) else {
        return;
    };
    let missing = shape.drift(body);
    if !missing.is_empty() {
        warn!(
            route = %spec.key,
            missing = ?missing,
            "Upstream response lacks fields the fallback fixture provides"
        );
        state.metrics.record_schema_drift(&spec.key);
    }
}

/// Map an upstream failure to a client response
pub(crate) fn handle_failure(
    state: &GatewayState,
    spec: &RouteSpec,
    upstream: &str,
    err: EgressError,
    ctx: &FallbackContext,
) -> IngressResult<Response> {
    match err.status() {
        Some(401) => {
            return Err(IngressError::Unauthenticated(
                err.detail_message()
                    .unwrap_or_else(|| "Authentication required".to_string()),
            ));
        }
        Some(403) => {
            return Err(IngressError::Forbidden(
                err.detail_message()
                    .unwrap_or_else(|| "Access denied".to_string()),
            ));
        }
        Some(status) if (400..500).contains(&status) => {
            return Err(IngressError::Upstream {
                status,
                message: err
                    .detail_message()
                    .unwrap_or_else(|| "Upstream rejected the request".to_string()),
            });
        }
        _ => {}
    }

    if !err.is_unavailable() {
        return Err(IngressError::Internal(format!(
            "{} request for {} failed: {}",
            upstream, spec.key, err
        )));
    }

    let reason = err.reason();
    let Some(fixture) = spec.degraded_fixture() else {
        warn!(
            route = %spec.key,
            upstream,
            reason,
            error = %err,
            "Upstream unavailable, no fallback for route"
        );
        return Err(IngressError::UpstreamUnavailable(upstream.to_string()));
    };

    let payload = match state.catalog.generate(fixture, ctx) {
        Ok(payload) => payload,
        Err(e) => {
            error!(route = %spec.key, fixture, "Fallback fixture failed: {}", e);
            return Err(IngressError::UpstreamUnavailable(upstream.to_string()));
        }
    };

    warn!(
        route = %spec.key,
        upstream,
        fixture,
        reason,
        error = %err,
        "Serving fallback payload"
    );
    state.metrics.record_fallback(&spec.key, reason);

    let mut response = (StatusCode::OK, Json(ResponseEnvelope::fallback(payload))).into_response();
    response
        .headers_mut()
        .insert(FALLBACK_HEADER, HeaderValue::from_static(reason));
    Ok(response)
}
