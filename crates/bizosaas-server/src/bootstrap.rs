//! Builds gateway state from a resolved `ServerConfig`

use anyhow::{Context, anyhow, bail};
use bizosaas_egress::{HttpClientConfig, UpstreamClient};
use bizosaas_fallback::FallbackCatalog;
use bizosaas_ingress::{GatewayState, Upstreams};
use bizosaas_observability::Metrics;
use bizosaas_routing::{HostTable, RouteTable};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ServerConfig, UpstreamSettings};

/// Fail in strict mode, otherwise warn, for upstreams on their localhost default
pub fn check_upstream_defaults(config: &ServerConfig) -> anyhow::Result<()> {
    let defaulted: Vec<String> = [
        ("brain", "BRAIN_API_URL", config.brain_url()),
        ("auth", "AUTH_SERVICE_URL", config.auth_url()),
    ]
    .into_iter()
    .filter(|(_, _, (_, is_default))| *is_default)
    .map(|(name, var, (url, _))| format!("{} ({}, set {})", name, url, var))
    .collect();

    if defaulted.is_empty() {
        return Ok(());
    }
    if config.strict_upstreams {
        bail!(
            "upstreams not configured: {}; refusing to start with strict_upstreams",
            defaulted.join(", ")
        );
    }
    for upstream in &defaulted {
        warn!("Upstream using localhost default: {}", upstream);
    }
    Ok(())
}

/// Upper bound on configured GET retries
const MAX_RETRIES: u32 = 5;

fn client_config(settings: &UpstreamSettings) -> HttpClientConfig {
    let defaults = HttpClientConfig::default();
    let mut max_retries = settings.max_retries.unwrap_or(defaults.max_retries);
    if max_retries > MAX_RETRIES {
        warn!(
            "max_retries {} exceeds the limit, using {}",
            max_retries, MAX_RETRIES
        );
        max_retries = MAX_RETRIES;
    }
    HttpClientConfig {
        timeout_ms: settings.timeout_ms.unwrap_or(defaults.timeout_ms),
        max_retries,
        ..defaults
    }
}

pub fn build_upstreams(config: &ServerConfig) -> anyhow::Result<Upstreams> {
    let (brain_url, _) = config.brain_url();
    let (auth_url, _) = config.auth_url();

    let brain = UpstreamClient::new(
        "brain",
        &brain_url,
        &client_config(&config.upstreams.brain),
    )
    .context("invalid brain upstream")?;
    let auth = UpstreamClient::new("auth", &auth_url, &client_config(&config.upstreams.auth))
        .context("invalid auth upstream")?;

    let mut upstreams = Upstreams::new(brain, auth);
    if let Some(settings) = &config.upstreams.frontend
        && let Some(url) = settings.base_url.as_deref().filter(|u| !u.trim().is_empty())
    {
        let frontend = UpstreamClient::new("frontend", url, &client_config(settings))
            .context("invalid frontend upstream")?;
        upstreams = upstreams.with_frontend(frontend);
    }
    Ok(upstreams)
}

pub fn build_routes(config: &ServerConfig) -> anyhow::Result<RouteTable> {
    let mut routes = if config.routes.replace_defaults {
        RouteTable::new()
    } else {
        RouteTable::with_defaults()
    };
    routes.extend(config.routes.entries.iter().cloned())?;
    Ok(routes)
}

pub fn build_hosts(config: &ServerConfig) -> anyhow::Result<HostTable> {
    let mut hosts = if config.domains.replace_defaults {
        HostTable::new()
    } else {
        HostTable::with_defaults()
    };
    hosts.extend(config.domains.entries.iter().cloned())?;
    Ok(hosts)
}

/// Fixtures must match their shapes and every route's fallback must exist
pub fn build_catalog(routes: &RouteTable) -> anyhow::Result<FallbackCatalog> {
    let catalog = FallbackCatalog::with_builtin();
    catalog.validate_all()?;

    let missing: Vec<&str> = routes
        .fallback_names()
        .into_iter()
        .filter(|name| !catalog.contains(name))
        .collect();
    if !missing.is_empty() {
        bail!("routes reference unknown fallback fixtures: {}", missing.join(", "));
    }
    Ok(catalog)
}

pub fn build_state(config: &ServerConfig) -> anyhow::Result<GatewayState> {
    let routes = build_routes(config)?;
    let hosts = build_hosts(config)?;
    let catalog = build_catalog(&routes)?;
    let upstreams = build_upstreams(config)?;
    let metrics =
        Metrics::new().map_err(|e| anyhow!("failed to create metrics registry: {}", e))?;

    info!(
        routes = routes.len(),
        hosts = hosts.len(),
        fixtures = catalog.len(),
        brain = upstreams.brain.base_url(),
        auth = upstreams.auth.base_url(),
        frontend = upstreams.frontend.as_ref().map(|f| f.base_url()),
        "Gateway configured"
    );

    Ok(
        GatewayState::new(routes, hosts, catalog, upstreams, Arc::new(metrics))
            .with_secure_cookies(config.secure_cookies),
    )
}
