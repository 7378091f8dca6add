//! BizOSaaS Routing
//!
//! Static routing data the gateway consults per request:
//! - `RouteTable`: proxy routes under `/api/brain/`, their upstream and
//!   fallback policy
//! - `HostTable`: hostname to platform type and root rewrite

pub mod host_table;
pub mod route_table;

pub use host_table::{DomainRoute, HostTable, PlatformType};
pub use route_table::{FallbackPolicy, RouteMethod, RouteSpec, RouteTable, UpstreamKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Invalid route '{key}': {reason}")]
    InvalidRoute { key: String, reason: String },

    #[error("Invalid host entry '{host}': {reason}")]
    InvalidHost { host: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RoutingError>;
