//! Shared ingress types and utilities

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request ID for tracing; echoed to clients and forwarded upstream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Accept a client-supplied id if it is short printable ASCII
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let valid = !value.is_empty()
            && value.len() <= 128
            && value.bytes().all(|b| b.is_ascii_graphic());
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors returned to gateway clients
///
/// Bodies carry a stable `type` and a client-safe message. Internal
/// details go to the log, never to the body.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream 4xx passed through with its status and detail
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Upstream down and no fallback may be served (502)
    #[error("{0} is unavailable")]
    UpstreamUnavailable(String),

    /// Upstream down on a route that never degrades (503), e.g. auth
    #[error("{0} is unavailable")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::InvalidRequest(_) | IngressError::MissingFields(_) => {
                StatusCode::BAD_REQUEST
            }
            IngressError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            IngressError::Forbidden(_) => StatusCode::FORBIDDEN,
            IngressError::NotFound(_) => StatusCode::NOT_FOUND,
            IngressError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            IngressError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            IngressError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            IngressError::InvalidRequest(_) | IngressError::MissingFields(_) => "invalid_request",
            IngressError::Unauthenticated(_) => "unauthenticated",
            IngressError::Forbidden(_) => "forbidden",
            IngressError::NotFound(_) => "not_found",
            IngressError::Upstream { .. } => "upstream_error",
            IngressError::UpstreamUnavailable(_) | IngressError::ServiceUnavailable(_) => {
                "upstream_unavailable"
            }
            IngressError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            IngressError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut error = serde_json::json!({
            "type": self.error_type(),
            "message": message,
            "code": status.as_u16(),
        });
        if let IngressError::MissingFields(fields) = &self {
            error["missing_fields"] = serde_json::json!(fields);
        }

        (status, axum::Json(serde_json::json!({ "error": error }))).into_response()
    }
}

pub type IngressResult<T> = Result<T, IngressError>;
