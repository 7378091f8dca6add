//! BizOSaaS gateway observability
//!
//! - Prometheus metrics for requests, upstream calls and served fallbacks
//! - Liveness, readiness and metrics endpoints
//! - Per-upstream health tracking

pub mod health;
pub mod metrics;
pub mod upstream_health;

pub use health::{HealthState, ReadinessChecker, UpstreamStatus, health_router};
pub use metrics::Metrics;
pub use upstream_health::UpstreamHealth;
