//! Error types for BizOSaaS Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
