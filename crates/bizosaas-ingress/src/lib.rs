//! BizOSaaS gateway ingress
//!
//! HTTP surface of the gateway:
//! - `/api/brain/{domain}/{*resource}` proxy with per-route fallback policy
//! - `/api/brain/dashboard/overview` aggregation
//! - `/api/auth/*` backend-for-frontend auth routes
//! - tenant host routing and frontend bypass

pub mod aggregate;
pub mod auth_routes;
pub mod bypass;
pub mod middleware;
pub mod proxy;
pub mod router;
pub mod state;
pub mod types;

pub use proxy::FALLBACK_HEADER;
pub use router::gateway_router;
pub use state::{GatewayState, Upstreams};
pub use types::{IngressError, IngressResult, RequestId};
