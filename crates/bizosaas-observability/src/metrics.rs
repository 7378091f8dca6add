//! Metrics collection with Prometheus
//!
//! - Requests by route, method and status
//! - Upstream call outcomes and latency
//! - Fallback payloads served in place of live data
//! - Live payloads missing fields their fallback fixture declares

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for the gateway
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    /// Requests handled, by route key, method and response status
    pub requests_total: CounterVec,
    /// End-to-end request duration
    pub request_duration_seconds: HistogramVec,
    /// Upstream calls by upstream name and outcome
    pub upstream_requests_total: CounterVec,
    /// Upstream call duration
    pub upstream_duration_seconds: HistogramVec,
    /// Fallback payloads served, by route and failure reason
    pub fallback_served_total: CounterVec,
    /// Live responses lacking fields of the route's fixture shape
    pub schema_drift_total: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("bizosaas_requests_total", "Total number of proxied requests"),
            &["route", "method", "status"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bizosaas_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["route"],
        )?;

        let upstream_requests_total = CounterVec::new(
            Opts::new(
                "bizosaas_upstream_requests_total",
                "Total number of upstream calls",
            ),
            &["upstream", "outcome"],
        )?;

        let upstream_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "bizosaas_upstream_duration_seconds",
                "Upstream call duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["upstream"],
        )?;

        let fallback_served_total = CounterVec::new(
            Opts::new(
                "bizosaas_fallback_served_total",
                "Total number of responses served from fallback fixtures",
            ),
            &["route", "reason"],
        )?;

        let schema_drift_total = CounterVec::new(
            Opts::new(
                "bizosaas_schema_drift_total",
                "Live upstream responses missing fields the fallback fixture provides",
            ),
            &["route"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(upstream_requests_total.clone()))?;
        registry.register(Box::new(upstream_duration_seconds.clone()))?;
        registry.register(Box::new(fallback_served_total.clone()))?;
        registry.register(Box::new(schema_drift_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration_seconds,
            upstream_requests_total,
            upstream_duration_seconds,
            fallback_served_total,
            schema_drift_total,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_request(&self, route: &str, method: &str, status: u16, duration_secs: f64) {
        self.requests_total
            .with_label_values(&[route, method, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[route])
            .observe(duration_secs);
    }

    /// `outcome` is `ok` or an egress failure reason such as `timeout`
    pub fn record_upstream(&self, upstream: &str, outcome: &str, duration_secs: f64) {
        self.upstream_requests_total
            .with_label_values(&[upstream, outcome])
            .inc();
        self.upstream_duration_seconds
            .with_label_values(&[upstream])
            .observe(duration_secs);
    }

    pub fn record_fallback(&self, route: &str, reason: &str) {
        self.fallback_served_total
            .with_label_values(&[route, reason])
            .inc();
    }

    pub fn record_schema_drift(&self, route: &str) {
        self.schema_drift_total.with_label_values(&[route]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> f64 {
        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == name)
            .unwrap_or_else(|| panic!("{} metric not found", name));
        family.metric[0].counter.as_ref().unwrap().value.unwrap()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("wagtail/homepage", "GET", 200, 0.01);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("wagtail/homepage", "GET", 200, 0.02);
        metrics.record_request("wagtail/homepage", "GET", 200, 0.03);

        assert_eq!(counter_value(&metrics, "bizosaas_requests_total"), 2.0);
    }

    #[test]
    fn test_record_upstream() {
        let metrics = Metrics::new().unwrap();
        metrics.record_upstream("brain", "timeout", 5.0);

        assert_eq!(
            counter_value(&metrics, "bizosaas_upstream_requests_total"),
            1.0
        );
    }

    #[test]
    fn test_record_fallback() {
        let metrics = Metrics::new().unwrap();
        metrics.record_fallback("saleor/products", "connect_error");

        assert_eq!(
            counter_value(&metrics, "bizosaas_fallback_served_total"),
            1.0
        );
    }

    #[test]
    fn test_record_schema_drift() {
        let metrics = Metrics::new().unwrap();
        metrics.record_schema_drift("wagtail/homepage");
        metrics.record_schema_drift("wagtail/homepage");

        assert_eq!(counter_value(&metrics, "bizosaas_schema_drift_total"), 2.0);
    }

    #[test]
    fn test_independent_registries() {
        // Each collector owns its registry, so tests and app instances never collide
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_fallback("crm/leads", "timeout");
        b.record_fallback("crm/leads", "timeout");
        assert_eq!(counter_value(&a, "bizosaas_fallback_served_total"), 1.0);
    }
}
