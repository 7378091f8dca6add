//! Passive upstream health, fed by the outcome of proxied calls

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::health::{ReadinessChecker, UpstreamStatus};

/// Failures in a row before an upstream counts as unhealthy
pub const UNHEALTHY_AFTER: u64 = 3;

#[derive(Debug, Default)]
struct Tracker {
    has_fallback: bool,
    consecutive_failures: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    last_error: RwLock<Option<String>>,
}

/// Tracks each registered upstream. Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct UpstreamHealth {
    trackers: Arc<BTreeMap<String, Tracker>>,
}

impl UpstreamHealth {
    /// `upstreams` pairs each name with whether fallbacks cover it
    pub fn new<I, S>(upstreams: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let trackers = upstreams
            .into_iter()
            .map(|(name, has_fallback)| {
                (
                    name.into(),
                    Tracker {
                        has_fallback,
                        ..Tracker::default()
                    },
                )
            })
            .collect();
        Self {
            trackers: Arc::new(trackers),
        }
    }

    pub fn record_success(&self, upstream: &str) {
        if let Some(t) = self.trackers.get(upstream) {
            t.successes.fetch_add(1, Ordering::Relaxed);
            t.consecutive_failures.store(0, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self, upstream: &str, reason: &str) {
        if let Some(t) = self.trackers.get(upstream) {
            t.failures.fetch_add(1, Ordering::Relaxed);
            t.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut last) = t.last_error.write() {
                *last = Some(reason.to_string());
            }
        }
    }

    pub fn consecutive_failures(&self, upstream: &str) -> u64 {
        self.trackers
            .get(upstream)
            .map(|t| t.consecutive_failures.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn is_healthy(&self, upstream: &str) -> bool {
        self.consecutive_failures(upstream) < UNHEALTHY_AFTER
    }
}

fn status_label(consecutive_failures: u64) -> &'static str {
    match consecutive_failures {
        0 => "healthy",
        n if n < UNHEALTHY_AFTER => "degraded",
        _ => "unhealthy",
    }
}

impl ReadinessChecker for UpstreamHealth {
    fn is_ready(&self) -> bool {
        self.trackers
            .values()
            .all(|t| t.has_fallback || t.consecutive_failures.load(Ordering::Relaxed) < UNHEALTHY_AFTER)
    }

    fn upstream_statuses(&self) -> Vec<UpstreamStatus> {
        self.trackers
            .iter()
            .map(|(name, t)| {
                let consecutive_failures = t.consecutive_failures.load(Ordering::Relaxed);
                UpstreamStatus {
                    name: name.clone(),
                    status: status_label(consecutive_failures).to_string(),
                    has_fallback: t.has_fallback,
                    consecutive_failures,
                    total_successes: t.successes.load(Ordering::Relaxed),
                    total_failures: t.failures.load(Ordering::Relaxed),
                    last_error: t.last_error.read().ok().and_then(|e| e.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health() -> UpstreamHealth {
        UpstreamHealth::new([("brain", true), ("auth", false)])
    }

    #[test]
    fn test_failures_degrade_then_fail() {
        let h = health();
        h.record_failure("auth", "connect_error");
        assert!(h.is_healthy("auth"));
        assert_eq!(h.upstream_statuses()[0].status, "degraded");

        h.record_failure("auth", "connect_error");
        h.record_failure("auth", "timeout");
        assert!(!h.is_healthy("auth"));
        assert!(!h.is_ready());

        let auth = &h.upstream_statuses()[0];
        assert_eq!(auth.name, "auth");
        assert_eq!(auth.status, "unhealthy");
        assert_eq!(auth.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_success_resets_streak() {
        let h = health();
        h.record_failure("auth", "timeout");
        h.record_failure("auth", "timeout");
        h.record_success("auth");
        assert_eq!(h.consecutive_failures("auth"), 0);
    }

    #[test]
    fn test_totals_survive_streak_reset() {
        let h = health();
        h.record_success("auth");
        h.record_failure("auth", "timeout");
        h.record_failure("auth", "timeout");
        h.record_success("auth");

        let auth = &h.upstream_statuses()[0];
        assert_eq!(auth.consecutive_failures, 0);
        assert_eq!(auth.total_successes, 2);
        assert_eq!(auth.total_failures, 2);
    }

    #[test]
    fn test_fallback_covered_upstream_keeps_ready() {
        let h = health();
        for _ in 0..5 {
            h.record_failure("brain", "connect_error");
        }
        assert!(!h.is_healthy("brain"));
        assert!(h.is_ready());
    }

    #[test]
    fn test_unknown_upstream_ignored() {
        let h = health();
        h.record_failure("saleor", "timeout");
        assert_eq!(h.consecutive_failures("saleor"), 0);
        assert_eq!(h.upstream_statuses().len(), 2);
    }
}
