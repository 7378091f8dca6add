//! Stateless calls to the auth service

use bizosaas_core::session::User;
use bizosaas_core::tenant::{TenantId, TenantSummary};
use bizosaas_egress::{ForwardHeaders, UpstreamClient, UpstreamRequest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use tracing::debug;

use crate::{AuthError, Result};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const SIGNUP_PATH: &str = "/api/auth/register";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ME_PATH: &str = "/api/auth/me";
pub const TENANTS_PATH: &str = "/api/auth/tenants";
pub const SWITCH_TENANT_PATH: &str = "/api/auth/switch-tenant";

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("company_name", &self.company_name)
            .finish()
    }
}

/// Body of a successful login or signup
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Absent when signup requires email verification first
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .field("user", &self.user)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Body of a successful tenant switch
#[derive(Clone, Deserialize)]
pub struct TenantSwitch {
    pub access_token: String,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TenantSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantSwitch")
            .field("access_token", &"[redacted]")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

#[derive(Deserialize)]
struct TenantList {
    tenants: Vec<TenantSummary>,
}

/// Thin typed wrapper over the auth service endpoints
#[derive(Debug, Clone)]
pub struct AuthApi {
    upstream: UpstreamClient,
}

impl AuthApi {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self { upstream }
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    pub async fn login(
        &self,
        credentials: &LoginRequest,
        headers: ForwardHeaders,
    ) -> Result<LoginResponse> {
        debug!(email = %credentials.email, "Logging in");
        let body = to_body(credentials)?;
        self.call(UpstreamRequest::post(LOGIN_PATH, body).with_headers(headers))
            .await
    }

    pub async fn signup(
        &self,
        request: &SignupRequest,
        headers: ForwardHeaders,
    ) -> Result<LoginResponse> {
        debug!(email = %request.email, "Signing up");
        let body = to_body(request)?;
        self.call(UpstreamRequest::post(SIGNUP_PATH, body).with_headers(headers))
            .await
    }

    pub async fn logout(&self, access_token: &str, headers: ForwardHeaders) -> Result<()> {
        let request = UpstreamRequest::post(LOGOUT_PATH, json!({}))
            .with_headers(headers.with_authorization(bearer(access_token)));
        self.upstream.send(&request).await?;
        Ok(())
    }

    pub async fn current_user(&self, access_token: &str, headers: ForwardHeaders) -> Result<User> {
        let request = UpstreamRequest::get(ME_PATH)
            .with_headers(headers.with_authorization(bearer(access_token)));
        self.call(request).await
    }

    pub async fn tenants(
        &self,
        access_token: &str,
        headers: ForwardHeaders,
    ) -> Result<Vec<TenantSummary>> {
        let request = UpstreamRequest::get(TENANTS_PATH)
            .with_headers(headers.with_authorization(bearer(access_token)));
        let list: TenantList = self.call(request).await?;
        Ok(list.tenants)
    }

    pub async fn switch_tenant(
        &self,
        access_token: &str,
        tenant_id: &TenantId,
        headers: ForwardHeaders,
    ) -> Result<TenantSwitch> {
        let request = UpstreamRequest::post(SWITCH_TENANT_PATH, json!({ "tenant_id": tenant_id }))
            .with_headers(headers.with_authorization(bearer(access_token)));
        self.call(request).await
    }

    async fn call<T: DeserializeOwned>(&self, request: UpstreamRequest) -> Result<T> {
        let response = self.upstream.send(&request).await?;
        serde_json::from_value(response.body)
            .map_err(|e| AuthError::InvalidResponse(format!("{}: {}", request.path, e)))
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

fn to_body<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| AuthError::InvalidResponse(e.to_string()))
}
