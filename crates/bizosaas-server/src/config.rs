use bizosaas_routing::{DomainRoute, RouteSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BRAIN_URL: &str = "http://localhost:8001";
pub const DEFAULT_AUTH_URL: &str = "http://localhost:8007";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Invalid log format '{}'. Use 'text' or 'json'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub upstreams: UpstreamsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub domains: DomainsConfig,

    #[serde(default)]
    pub routes: RoutesConfig,

    /// Refuse to start when an upstream URL is the localhost default
    #[serde(default)]
    pub strict_upstreams: bool,

    /// Mark auth cookies `Secure`; enable behind TLS
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamsConfig {
    #[serde(default)]
    pub brain: UpstreamSettings,
    #[serde(default)]
    pub auth: UpstreamSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend: Option<UpstreamSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Retries for GET requests, off unless set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

/// Hostname table entries; extend the built-ins unless `replace_defaults`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainsConfig {
    #[serde(default)]
    pub replace_defaults: bool,
    #[serde(default)]
    pub entries: Vec<DomainRoute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutesConfig {
    #[serde(default)]
    pub replace_defaults: bool,
    #[serde(default)]
    pub entries: Vec<RouteSpec>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstreams: UpstreamsConfig::default(),
            logging: LoggingConfig::default(),
            domains: DomainsConfig::default(),
            routes: RoutesConfig::default(),
            strict_upstreams: false,
            secure_cookies: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // Both the gateway names and the frontend's NEXT_PUBLIC_* names are honoured
        if let Some(url) = first_env(&["BRAIN_API_URL", "NEXT_PUBLIC_API_BASE_URL"]) {
            self.upstreams.brain.base_url = Some(url);
        }

        if let Some(url) = first_env(&["AUTH_SERVICE_URL", "NEXT_PUBLIC_AUTH_API_URL"]) {
            self.upstreams.auth.base_url = Some(url);
        }

        if let Some(url) = first_env(&["BIZOSAAS_FRONTEND_URL"]) {
            self.upstreams
                .frontend
                .get_or_insert_with(UpstreamSettings::default)
                .base_url = Some(url);
        }

        if let Ok(val) = std::env::var("BIZOSAAS_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("BIZOSAAS_LOG_FORMAT") {
            match val.parse() {
                Ok(format) => self.logging.format = format,
                Err(e) => eprintln!("Warning: {}, keeping {:?}", e, self.logging.format),
            }
        }

        if let Ok(val) = std::env::var("BIZOSAAS_STRICT_UPSTREAMS") {
            match val.parse::<bool>() {
                Ok(strict) => self.strict_upstreams = strict,
                Err(_) => eprintln!("Warning: Invalid BIZOSAAS_STRICT_UPSTREAMS '{}'", val),
            }
        }

        if let Ok(val) = std::env::var("BIZOSAAS_SECURE_COOKIES")
            && let Ok(secure) = val.parse::<bool>()
        {
            self.secure_cookies = secure;
        }

        // Server settings
        if let Ok(val) = std::env::var("BIZOSAAS_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid BIZOSAAS_PORT '{}', using {}", val, self.port),
            }
        }

        if let Ok(val) = std::env::var("BIZOSAAS_HOST") {
            self.host = val;
        }
    }

    /// Brain base URL and whether it is the built-in default
    pub fn brain_url(&self) -> (String, bool) {
        resolve_url(&self.upstreams.brain, DEFAULT_BRAIN_URL)
    }

    pub fn auth_url(&self) -> (String, bool) {
        resolve_url(&self.upstreams.auth, DEFAULT_AUTH_URL)
    }
}

fn resolve_url(settings: &UpstreamSettings, default: &str) -> (String, bool) {
    match settings.base_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => (url.to_string(), false),
        _ => (default.to_string(), true),
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}
