//! `GET /api/brain/dashboard/overview`
//!
//! Fans out to the dashboard parts concurrently; each part falls back to
//! its own fixture independently.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bizosaas_core::{ResponseEnvelope, Source};
use bizosaas_egress::{EgressError, ForwardHeaders, UpstreamRequest};
use bizosaas_fallback::{FallbackContext, fixtures};
use futures::future::join_all;
use serde_json::{Map, Value, json};
use std::time::Instant;
use tracing::warn;

use crate::proxy::FALLBACK_HEADER;
use crate::state::GatewayState;
use crate::types::IngressError;

pub const OVERVIEW_ROUTE: &str = "dashboard/overview";

/// Part name and the fixture standing in for it
pub const DASHBOARD_PARTS: [(&str, &str); 4] = [
    ("health", fixtures::DASHBOARD_HEALTH),
    ("tiers", fixtures::DASHBOARD_TIERS),
    ("services", fixtures::DASHBOARD_SERVICES),
    ("metrics", fixtures::DASHBOARD_METRICS),
];

enum Part {
    Live(Value),
    Fallback { payload: Value, reason: &'static str },
}

pub async fn dashboard_overview(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let response = overview(&state, &headers)
        .await
        .unwrap_or_else(IntoResponse::into_response);
    state.metrics.record_request(
        OVERVIEW_ROUTE,
        "GET",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn overview(state: &GatewayState, headers: &HeaderMap) -> Result<Response, IngressError> {
    let forward_headers = ForwardHeaders::from_header_map(headers);
    let brain = &state.upstreams.brain;

    let calls = DASHBOARD_PARTS.iter().map(|(part, _)| {
        let request = UpstreamRequest::get(format!("/api/brain/dashboard/{}", part))
            .with_headers(forward_headers.clone());
        async move {
            let started = Instant::now();
            let result = brain.send(&request).await;
            state.observe_egress(brain.name(), &result, started.elapsed().as_secs_f64());
            result
        }
    });
    let results = join_all(calls).await;

    let ctx = FallbackContext {
        tenant_host: forward_headers.tenant_host.clone(),
        ..FallbackContext::default()
    };

    let mut collected = Vec::with_capacity(DASHBOARD_PARTS.len());
    for ((part, fixture), result) in DASHBOARD_PARTS.iter().zip(results) {
        collected.push((*part, resolve_part(state, part, fixture, result, &ctx)?));
    }

    let mut parts = Map::new();
    let mut fallback_parts = Vec::new();
    let mut reasons: Vec<&'static str> = Vec::new();
    for (name, part) in collected {
        match part {
            Part::Live(value) => {
                parts.insert(name.to_string(), value);
            }
            Part::Fallback { payload, reason } => {
                parts.insert(name.to_string(), payload);
                fallback_parts.push(name);
                if !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
        }
    }

    let source = if fallback_parts.len() == DASHBOARD_PARTS.len() {
        Source::Fallback
    } else {
        Source::BrainGateway
    };
    let envelope = ResponseEnvelope::new(
        source,
        json!({ "parts": parts, "fallback_parts": fallback_parts }),
    );

    let mut response = (StatusCode::OK, Json(envelope)).into_response();
    if !reasons.is_empty()
        && let Ok(value) = HeaderValue::from_str(&reasons.join(","))
    {
        response.headers_mut().insert(FALLBACK_HEADER, value);
    }
    Ok(response)
}

/// Auth failures fail the whole overview; anything else degrades the part
fn resolve_part(
    state: &GatewayState,
    part: &str,
    fixture: &str,
    result: bizosaas_egress::Result<bizosaas_egress::UpstreamResponse>,
    ctx: &FallbackContext,
) -> Result<Part, IngressError> {
    let err = match result {
        Ok(response) => return Ok(Part::Live(response.body)),
        Err(err) => err,
    };

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
        _ => {}
    }

    let reason = match &err {
        EgressError::Status { status, .. } if *status < 500 => "upstream_rejected",
        other => other.reason(),
    };
    let payload = state.catalog.generate(fixture, ctx).map_err(|e| {
        IngressError::Internal(format!("dashboard fixture {} failed: {}", fixture, e))
    })?;

    warn!(part, fixture, reason, error = %err, "Serving fallback dashboard part");
    state.metrics.record_fallback(OVERVIEW_ROUTE, reason);
    Ok(Part::Fallback { payload, reason })
}
