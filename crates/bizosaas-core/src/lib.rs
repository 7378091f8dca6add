//! BizOSaaS Core Types
//!
//! This crate provides the fundamental types shared by the gateway crates:
//! - The tagged response envelope returned by every proxy route
//! - Tenant and auth session data models
//! - Core error types

pub mod envelope;
pub mod error;
pub mod session;
pub mod tenant;

pub use envelope::{ResponseEnvelope, Source};
pub use error::{Error, Result};
