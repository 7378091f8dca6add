//! Authenticated user and session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tenant::TenantId;

/// Signed-in user as returned by the auth service.
///
/// Never carries the access token; the token only lives in [`AuthSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Session created from a successful login
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: User,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub issued_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(access_token: String, user: User, tenant_id: Option<TenantId>) -> Self {
        let tenant_id = tenant_id.or_else(|| user.tenant_id.clone());
        Self {
            access_token,
            user,
            tenant_id,
            issued_at: Utc::now(),
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[redacted]")
            .field("user", &self.user)
            .field("tenant_id", &self.tenant_id)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u-1".to_string(),
            email: "owner@bizoholic.com".to_string(),
            first_name: Some("Alex".to_string()),
            last_name: None,
            role: Some("tenant_admin".to_string()),
            tenant_id: Some(TenantId::from_string("bizoholic").unwrap()),
        }
    }

    #[test]
    fn test_session_inherits_user_tenant() {
        let session = AuthSession::new("tok".to_string(), user(), None);
        assert_eq!(session.tenant_id.unwrap().as_str(), "bizoholic");
    }

    #[test]
    fn test_debug_redacts_token() {
        let session = AuthSession::new("super-secret".to_string(), user(), None);
        let debug = format!("{:?}", session);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_bearer_header() {
        let session = AuthSession::new("abc".to_string(), user(), None);
        assert_eq!(session.bearer(), "Bearer abc");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(user().display_name(), "Alex");
        let mut anonymous = user();
        anonymous.first_name = None;
        assert_eq!(anonymous.display_name(), "owner@bizoholic.com");
    }
}
