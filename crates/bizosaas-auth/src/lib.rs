//! BizOSaaS Auth Client
//!
//! Client for the auth microservice:
//! - `AuthApi`: stateless calls, one per auth endpoint
//! - `AuthClient`: a signed-in session on top of `AuthApi`, backed by an
//!   explicit `TokenStore`
//! - `MemoryTokenStore` / `FileTokenStore`: where the session lives

pub mod api;
pub mod client;
pub mod store;

pub use api::{AuthApi, LoginRequest, LoginResponse, SignupRequest, TenantSwitch};
pub use client::AuthClient;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

use bizosaas_egress::EgressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth service answered with a 4xx
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Auth service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid auth service response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl AuthError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Rejected { status, .. } => Some(*status),
            AuthError::NotAuthenticated => Some(401),
            _ => None,
        }
    }
}

impl From<EgressError> for AuthError {
    fn from(err: EgressError) -> Self {
        match &err {
            EgressError::Status { status, .. } if (400..500).contains(status) => {
                AuthError::Rejected {
                    status: *status,
                    message: err
                        .detail_message()
                        .unwrap_or_else(|| format!("Authentication failed ({})", status)),
                }
            }
            EgressError::ConfigError(msg) => AuthError::InvalidResponse(msg.clone()),
            _ => AuthError::Unavailable(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
