//! BizOSaaS Fallback Catalog
//!
//! Named fallback fixtures served when an upstream is unavailable:
//! - `FixtureShape` declares the keys a payload must carry
//! - `FallbackGenerator` produces a payload (static or computed per request)
//! - `FallbackCatalog` is the registry route handlers resolve fixtures from

pub mod catalog;
pub mod fixtures;
pub mod generator;
pub mod shape;

pub use catalog::FallbackCatalog;
pub use generator::{FallbackContext, FallbackGenerator, ReferralCodeGenerator, StaticFixture};
pub use shape::{FixtureShape, JsonKind, ShapeViolation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Unknown fallback fixture: {0}")]
    UnknownFixture(String),

    #[error("Fixture '{name}' does not match its shape: {violations:?}")]
    ShapeMismatch {
        name: String,
        violations: Vec<ShapeViolation>,
    },

    #[error("Fixture '{0}' is already registered")]
    Duplicate(String),
}

pub type Result<T> = std::result::Result<T, FallbackError>;
