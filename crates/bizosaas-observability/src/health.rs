//! Health endpoints
//!
//! - `/healthz` liveness, 200 while the process serves requests
//! - `/readyz` readiness, reports every upstream the gateway depends on
//! - `/metrics` Prometheus text exposition

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::Metrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstreams: Option<Vec<UpstreamStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One upstream as reported by `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamStatus {
    pub name: String,
    /// `healthy`, `degraded` or `unhealthy`
    pub status: String,
    /// Fallbacks cover this upstream, so it failing does not fail readiness
    pub has_fallback: bool,
    pub consecutive_failures: u64,
    /// Calls recorded since startup
    pub total_successes: u64,
    pub total_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub trait ReadinessChecker: Send + Sync {
    fn is_ready(&self) -> bool;

    fn upstream_statuses(&self) -> Vec<UpstreamStatus>;
}

#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<Metrics>,
    pub readiness_checker: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            readiness_checker: None,
        }
    }

    pub fn with_readiness_checker(
        metrics: Arc<Metrics>,
        readiness_checker: Arc<dyn ReadinessChecker>,
    ) -> Self {
        Self {
            metrics,
            readiness_checker: Some(readiness_checker),
        }
    }
}

pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: None,
    })
}

/// 503 only when an upstream without fallback coverage is unhealthy
async fn readyz(State(state): State<HealthState>) -> Response {
    let Some(checker) = &state.readiness_checker else {
        return (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                upstreams: None,
                message: None,
            }),
        )
            .into_response();
    };

    let upstreams = checker.upstream_statuses();
    if checker.is_ready() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                upstreams: Some(upstreams),
                message: None,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                upstreams: Some(upstreams),
                message: Some("One or more upstreams are unavailable".to_string()),
            }),
        )
            .into_response()
    }
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Failed to encode metrics: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}
