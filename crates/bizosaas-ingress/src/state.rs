//! Shared, read-only gateway state

use bizosaas_auth::AuthApi;
use bizosaas_egress::UpstreamClient;
use bizosaas_fallback::FallbackCatalog;
use bizosaas_observability::{Metrics, UpstreamHealth};
use bizosaas_routing::{HostTable, RouteTable, UpstreamKind};
use std::sync::Arc;

/// Backends the gateway talks to
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub brain: UpstreamClient,
    pub auth: UpstreamClient,
    /// Next.js app serving everything the gateway does not route
    pub frontend: Option<UpstreamClient>,
}

impl Upstreams {
    pub fn new(brain: UpstreamClient, auth: UpstreamClient) -> Self {
        Self {
            brain,
            auth,
            frontend: None,
        }
    }

    pub fn with_frontend(mut self, frontend: UpstreamClient) -> Self {
        self.frontend = Some(frontend);
        self
    }

    pub fn for_kind(&self, kind: UpstreamKind) -> &UpstreamClient {
        match kind {
            UpstreamKind::Brain => &self.brain,
            UpstreamKind::Auth => &self.auth,
        }
    }
}

#[derive(Clone)]
pub struct GatewayState {
    pub routes: Arc<RouteTable>,
    pub hosts: Arc<HostTable>,
    pub catalog: Arc<FallbackCatalog>,
    pub upstreams: Arc<Upstreams>,
    pub auth: AuthApi,
    pub metrics: Arc<Metrics>,
    pub health: UpstreamHealth,
    /// Add `Secure` to auth cookies
    pub secure_cookies: bool,
}

impl GatewayState {
    pub fn new(
        routes: RouteTable,
        hosts: HostTable,
        catalog: FallbackCatalog,
        upstreams: Upstreams,
        metrics: Arc<Metrics>,
    ) -> Self {
        let covered = |kind: UpstreamKind| {
            routes
                .routes()
                .iter()
                .any(|r| r.upstream == kind && r.degraded_fixture().is_some())
        };

        let mut tracked = vec![
            (upstreams.brain.name().to_string(), covered(UpstreamKind::Brain)),
            (upstreams.auth.name().to_string(), covered(UpstreamKind::Auth)),
        ];
        if let Some(frontend) = &upstreams.frontend {
            tracked.push((frontend.name().to_string(), false));
        }

        Self {
            health: UpstreamHealth::new(tracked),
            auth: AuthApi::new(upstreams.auth.clone()),
            routes: Arc::new(routes),
            hosts: Arc::new(hosts),
            catalog: Arc::new(catalog),
            upstreams: Arc::new(upstreams),
            metrics,
            secure_cookies: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Record one upstream call in metrics and health
    ///
    /// `failure` is the egress reason when the upstream was unreachable or
    /// broken; an upstream that answered with a 4xx still counts as up.
    pub(crate) fn observe_upstream(&self, upstream: &str, failure: Option<&str>, secs: f64) {
        match failure {
            None => {
                self.metrics.record_upstream(upstream, "ok", secs);
                self.health.record_success(upstream);
            }
            Some(reason) => {
                self.metrics.record_upstream(upstream, reason, secs);
                self.health.record_failure(upstream, reason);
            }
        }
    }

    pub(crate) fn observe_egress<T>(
        &self,
        upstream: &str,
        result: &bizosaas_egress::Result<T>,
        secs: f64,
    ) {
        match result {
            Err(e) if e.is_unavailable() => self.observe_upstream(upstream, Some(e.reason()), secs),
            Err(e) => {
                self.metrics.record_upstream(upstream, e.reason(), secs);
                self.health.record_success(upstream);
            }
            Ok(_) => self.observe_upstream(upstream, None, secs),
        }
    }
}
