//! Hostname to platform routing table
//!
//! The middleware in `bizosaas-ingress` consults this table to decide
//! what `/` means for a given `Host` and which platform headers to stamp.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{Result, RoutingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformType {
    SaasPlatform,
    CmsAdmin,
    #[default]
    MarketingWebsite,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::SaasPlatform => "saas-platform",
            PlatformType::CmsAdmin => "cms-admin",
            PlatformType::MarketingWebsite => "marketing-website",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRoute {
    pub host: String,
    pub platform_type: PlatformType,
    /// Path `/` is rewritten to
    pub root_path: String,
}

impl DomainRoute {
    pub fn new(host: &str, platform_type: PlatformType, root_path: &str) -> Self {
        Self {
            host: normalize_host(host),
            platform_type,
            root_path: root_path.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HostTable {
    entries: HashMap<String, DomainRoute>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for route in default_domains() {
            table.entries.insert(route.host.clone(), route);
        }
        table
    }

    /// Add or replace an entry
    pub fn insert(&mut self, route: DomainRoute) -> Result<()> {
        let host = normalize_host(&route.host);
        let invalid = |reason: &str| RoutingError::InvalidHost {
            host: route.host.clone(),
            reason: reason.to_string(),
        };

        if host.is_empty() {
            return Err(invalid("host is empty"));
        }
        if host.contains('/') {
            return Err(invalid("host must not contain a path"));
        }
        if !route.root_path.starts_with('/') {
            return Err(invalid("root_path must start with '/'"));
        }

        self.entries.insert(
            host.clone(),
            DomainRoute {
                host,
                platform_type: route.platform_type,
                root_path: route.root_path,
            },
        );
        Ok(())
    }

    pub fn extend(&mut self, routes: impl IntoIterator<Item = DomainRoute>) -> Result<()> {
        for route in routes {
            self.insert(route)?;
        }
        Ok(())
    }

    /// Exact match first (port included), then the host without its port
    pub fn lookup(&self, host: &str) -> Option<&DomainRoute> {
        let host = normalize_host(host);
        if let Some(route) = self.entries.get(&host) {
            return Some(route);
        }
        let bare = strip_port(&host);
        if bare != host {
            return self.entries.get(bare);
        }
        None
    }

    /// Platform for a host; unknown hosts are marketing sites
    pub fn platform_for(&self, host: &str) -> PlatformType {
        self.lookup(host)
            .map(|r| r.platform_type)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals keep their colons
    if let Some(end) = host.rfind(']') {
        return &host[..=end];
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

fn default_domains() -> Vec<DomainRoute> {
    vec![
        DomainRoute::new("bizoholic.com", PlatformType::MarketingWebsite, "/bizoholic"),
        DomainRoute::new("www.bizoholic.com", PlatformType::MarketingWebsite, "/bizoholic"),
        DomainRoute::new("coreldove.com", PlatformType::MarketingWebsite, "/coreldove"),
        DomainRoute::new("www.coreldove.com", PlatformType::MarketingWebsite, "/coreldove"),
        DomainRoute::new("app.bizosaas.com", PlatformType::SaasPlatform, "/dashboard"),
        DomainRoute::new("admin.bizosaas.com", PlatformType::SaasPlatform, "/dashboard"),
        DomainRoute::new("cms.bizoholic.com", PlatformType::CmsAdmin, "/admin"),
        DomainRoute::new("localhost:3001", PlatformType::SaasPlatform, "/dashboard"),
        DomainRoute::new("localhost:3002", PlatformType::CmsAdmin, "/admin"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_hosts() {
        let table = HostTable::with_defaults();

        let admin = table.lookup("admin.bizosaas.com").unwrap();
        assert_eq!(admin.platform_type, PlatformType::SaasPlatform);
        assert_eq!(admin.root_path, "/dashboard");

        let cms = table.lookup("CMS.Bizoholic.com").unwrap();
        assert_eq!(cms.platform_type, PlatformType::CmsAdmin);
    }

    #[test]
    fn test_lookup_strips_port_after_exact_miss() {
        let table = HostTable::with_defaults();

        // Exact entry with port wins
        assert_eq!(
            table.lookup("localhost:3002").unwrap().platform_type,
            PlatformType::CmsAdmin
        );
        // No entry with this port: fall back to the bare host
        assert_eq!(
            table.lookup("bizoholic.com:8443").unwrap().root_path,
            "/bizoholic"
        );
        // Bare localhost is not in the table
        assert!(table.lookup("localhost:3000").is_none());
    }

    #[test]
    fn test_unknown_host_defaults_to_marketing() {
        let table = HostTable::with_defaults();
        assert!(table.lookup("unknown.example.org").is_none());
        assert_eq!(
            table.platform_for("unknown.example.org"),
            PlatformType::MarketingWebsite
        );
    }

    #[test]
    fn test_insert_validates_entries() {
        let mut table = HostTable::new();
        assert!(
            table
                .insert(DomainRoute::new("", PlatformType::SaasPlatform, "/dashboard"))
                .is_err()
        );
        assert!(
            table
                .insert(DomainRoute::new("a.com/x", PlatformType::SaasPlatform, "/dashboard"))
                .is_err()
        );
        assert!(
            table
                .insert(DomainRoute::new("a.com", PlatformType::SaasPlatform, "dashboard"))
                .is_err()
        );
        assert!(
            table
                .insert(DomainRoute::new("tenant.example.com.", PlatformType::SaasPlatform, "/portal"))
                .is_ok()
        );
        assert_eq!(table.lookup("tenant.example.com").unwrap().root_path, "/portal");
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:3000"), "[::1]");
        assert_eq!(strip_port("example.com:"), "example.com:");
    }

    #[test]
    fn test_platform_type_serde() {
        let json = serde_json::to_string(&PlatformType::CmsAdmin).unwrap();
        assert_eq!(json, "\"cms-admin\"");
        let parsed: PlatformType = serde_json::from_str("\"saas-platform\"").unwrap();
        assert_eq!(parsed, PlatformType::SaasPlatform);
    }
}
