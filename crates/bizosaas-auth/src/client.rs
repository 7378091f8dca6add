//! Session-holding auth client
//!
//! Each `AuthClient` owns its `TokenStore`; nothing is shared between
//! clients. There is no automatic token refresh: a 401 from the auth
//! service ends the session.

use bizosaas_core::session::{AuthSession, User};
use bizosaas_core::tenant::{TenantId, TenantSummary};
use bizosaas_egress::ForwardHeaders;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{AuthApi, LoginRequest, SignupRequest};
use crate::store::{MemoryTokenStore, TokenStore};
use crate::{AuthError, Result};

pub struct AuthClient {
    api: AuthApi,
    store: Arc<dyn TokenStore>,
    headers: ForwardHeaders,
}

impl AuthClient {
    pub fn new(api: AuthApi, store: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            store,
            headers: ForwardHeaders::default(),
        }
    }

    /// Client whose session lives in memory only
    pub fn in_memory(api: AuthApi) -> Self {
        Self::new(api, Arc::new(MemoryTokenStore::new()))
    }

    /// Headers (tenant host, request id) sent with every call
    pub fn with_forward_headers(mut self, headers: ForwardHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub async fn session(&self) -> Result<Option<AuthSession>> {
        self.store.load().await
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(self.store.load().await, Ok(Some(_)))
    }

    /// Sign in and store the session. The returned user carries no token.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&credentials, self.headers.clone()).await?;
        let token = response.access_token.ok_or_else(|| {
            AuthError::InvalidResponse("login response has no access_token".to_string())
        })?;

        let session = AuthSession::new(token, response.user, response.tenant_id);
        self.store.save(&session).await?;
        info!(user_id = %session.user.id, "Signed in");
        Ok(session.user)
    }

    /// Register; stores a session when the service signs the user in directly
    pub async fn signup(&self, request: &SignupRequest) -> Result<User> {
        let response = self.api.signup(request, self.headers.clone()).await?;
        match response.access_token {
            Some(token) => {
                let session = AuthSession::new(token, response.user, response.tenant_id);
                self.store.save(&session).await?;
                Ok(session.user)
            }
            None => Ok(response.user),
        }
    }

    /// Always clears the local session, even if the service call fails
    pub async fn logout(&self) -> Result<()> {
        if let Some(session) = self.store.load().await?
            && let Err(e) = self
                .api
                .logout(&session.access_token, self.headers.clone())
                .await
        {
            warn!("Auth service logout failed, clearing local session anyway: {}", e);
        }
        self.store.clear().await
    }

    pub async fn get_current_user(&self) -> Result<User> {
        let mut session = self.require_session().await?;
        let user = self
            .expire_on_401(
                self.api
                    .current_user(&session.access_token, self.headers.clone())
                    .await,
            )
            .await?;

        if user != session.user {
            session.user = user.clone();
            self.store.save(&session).await?;
        }
        Ok(user)
    }

    pub async fn get_tenants(&self) -> Result<Vec<TenantSummary>> {
        let session = self.require_session().await?;
        self.expire_on_401(
            self.api
                .tenants(&session.access_token, self.headers.clone())
                .await,
        )
        .await
    }

    /// Switch the active tenant; the new token replaces the stored one
    pub async fn switch_tenant(&self, tenant_id: &TenantId) -> Result<AuthSession> {
        let session = self.require_session().await?;
        let switch = self
            .expire_on_401(
                self.api
                    .switch_tenant(&session.access_token, tenant_id, self.headers.clone())
                    .await,
            )
            .await?;

        let session = AuthSession::new(switch.access_token, session.user, Some(switch.tenant_id));
        self.store.save(&session).await?;
        info!(tenant_id = ?session.tenant_id, "Switched tenant");
        Ok(session)
    }

    async fn require_session(&self) -> Result<AuthSession> {
        self.store.load().await?.ok_or(AuthError::NotAuthenticated)
    }

    async fn expire_on_401<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Err(AuthError::Rejected { status: 401, .. }) => {
                self.store.clear().await?;
                Err(AuthError::NotAuthenticated)
            }
            other => other,
        }
    }
}
