//! Backend-for-frontend auth routes under `/api/auth/`
//!
//! Tokens travel to the browser as HttpOnly cookies. These routes never
//! serve fallbacks: if the auth service is down they answer 503.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bizosaas_auth::{AuthError, LoginRequest, LoginResponse, SignupRequest};
use bizosaas_core::tenant::TenantId;
use bizosaas_core::{ResponseEnvelope, Source};
use bizosaas_egress::ForwardHeaders;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Instant;
use tracing::{info, warn};

use crate::state::GatewayState;
use crate::types::{IngressError, IngressResult};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
const ACCESS_MAX_AGE_SECS: u64 = 24 * 60 * 60;
const REFRESH_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

pub async fn login(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    let result = async {
        let credentials: LoginRequest = parse_json(&body, &["email", "password"])?;
        let forward = ForwardHeaders::from_header_map(&headers);
        let response = call_auth(&state, state.auth.login(&credentials, forward)).await?;
        info!(user_id = %response.user.id, "User signed in");
        signed_in(&state, response)
    }
    .await;
    finish(&state, "auth/login", "POST", started, result)
}

pub async fn signup(State(state): State<GatewayState>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    let result = async {
        let request: SignupRequest = parse_json(&body, &["email", "password"])?;
        let forward = ForwardHeaders::from_header_map(&headers);
        let response = call_auth(&state, state.auth.signup(&request, forward)).await?;
        info!(user_id = %response.user.id, "User signed up");
        signed_in(&state, response)
    }
    .await;
    finish(&state, "auth/signup", "POST", started, result)
}

/// Clears both cookies; the auth service call is best effort
pub async fn logout(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    if let Some(token) = session_token(&headers) {
        let forward = ForwardHeaders::from_header_map(&headers);
        if let Err(e) = call_auth(&state, state.auth.logout(&token, forward)).await {
            warn!("Auth service logout failed, clearing cookies anyway: {}", e);
        }
    }

    let result = logged_out(state.secure_cookies);
    finish(&state, "auth/logout", "POST", started, result)
}

pub async fn me(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = async {
        let token = require_token(&headers)?;
        let forward = ForwardHeaders::from_header_map(&headers);
        let user = call_auth(&state, state.auth.current_user(&token, forward)).await?;
        Ok::<_, IngressError>(ok(json!({ "user": user })))
    }
    .await;
    finish(&state, "auth/me", "GET", started, result)
}

pub async fn tenants(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = async {
        let token = require_token(&headers)?;
        let forward = ForwardHeaders::from_header_map(&headers);
        let tenants = call_auth(&state, state.auth.tenants(&token, forward)).await?;
        Ok::<_, IngressError>(ok(json!({ "tenants": tenants })))
    }
    .await;
    finish(&state, "auth/tenants", "GET", started, result)
}

pub async fn switch_tenant(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = async {
        let token = require_token(&headers)?;
        let body: Value = parse_json(&body, &["tenant_id"])?;
        let tenant_id = body
            .get("tenant_id")
            .and_then(Value::as_str)
            .ok_or_else(|| IngressError::InvalidRequest("tenant_id must be a string".to_string()))
            .and_then(|s| {
                TenantId::from_string(s).map_err(|e| IngressError::InvalidRequest(e.to_string()))
            })?;

        let forward = ForwardHeaders::from_header_map(&headers);
        let switch = call_auth(&state, state.auth.switch_tenant(&token, &tenant_id, forward)).await?;
        info!(tenant_id = %switch.tenant_id, "Switched tenant");

        let mut response = ok(json!({
            "tenant_id": switch.tenant_id,
            "access_token": switch.access_token,
        }));
        set_cookie(
            &mut response,
            ACCESS_COOKIE,
            &switch.access_token,
            ACCESS_MAX_AGE_SECS,
            state.secure_cookies,
        )?;
        if let Some(refresh) = &switch.refresh_token {
            set_cookie(
                &mut response,
                REFRESH_COOKIE,
                refresh,
                REFRESH_MAX_AGE_SECS,
                state.secure_cookies,
            )?;
        }
        Ok::<_, IngressError>(response)
    }
    .await;
    finish(&state, "auth/switch-tenant", "POST", started, result)
}

fn logged_out(secure: bool) -> IngressResult<Response> {
    let mut response = ok(json!({ "message": "Logged out" }));
    set_cookie(&mut response, ACCESS_COOKIE, "", 0, secure)?;
    set_cookie(&mut response, REFRESH_COOKIE, "", 0, secure)?;
    Ok(response)
}

fn signed_in(state: &GatewayState, response: LoginResponse) -> IngressResult<Response> {
    let mut reply = ok(json!({
        "user": response.user,
        "tenant_id": response.tenant_id,
        "access_token": response.access_token,
    }));
    if let Some(token) = &response.access_token {
        set_cookie(
            &mut reply,
            ACCESS_COOKIE,
            token,
            ACCESS_MAX_AGE_SECS,
            state.secure_cookies,
        )?;
    }
    if let Some(refresh) = &response.refresh_token {
        set_cookie(
            &mut reply,
            REFRESH_COOKIE,
            refresh,
            REFRESH_MAX_AGE_SECS,
            state.secure_cookies,
        )?;
    }
    Ok(reply)
}

/// Run one auth service call, recording its outcome
async fn call_auth<T>(
    state: &GatewayState,
    call: impl Future<Output = bizosaas_auth::Result<T>>,
) -> IngressResult<T> {
    let upstream = state.auth.upstream().name();
    let started = Instant::now();
    let result = call.await;
    let failure = matches!(result, Err(AuthError::Unavailable(_))).then_some("unavailable");
    state.observe_upstream(upstream, failure, started.elapsed().as_secs_f64());

    result.map_err(|err| match err {
        AuthError::Rejected { status: 401, message } => IngressError::Unauthenticated(message),
        AuthError::Rejected { status: 403, message } => IngressError::Forbidden(message),
        AuthError::Rejected { status, message } => IngressError::Upstream { status, message },
        AuthError::NotAuthenticated => {
            IngressError::Unauthenticated("Not authenticated".to_string())
        }
        AuthError::Unavailable(detail) => {
            warn!(upstream, "Auth service unavailable: {}", detail);
            IngressError::ServiceUnavailable(upstream.to_string())
        }
        AuthError::InvalidResponse(detail) | AuthError::Storage(detail) => {
            IngressError::Internal(detail)
        }
    })
}

fn finish(
    state: &GatewayState,
    route: &str,
    method: &str,
    started: Instant,
    result: IngressResult<Response>,
) -> Response {
    let response = result.unwrap_or_else(IntoResponse::into_response);
    state.metrics.record_request(
        route,
        method,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

fn ok(payload: Value) -> Response {
    (
        StatusCode::OK,
        Json(ResponseEnvelope::new(Source::AuthService, payload)),
    )
        .into_response()
}

/// Decode a JSON body after checking `required` top-level fields
fn parse_json<T: DeserializeOwned>(body: &Bytes, required: &[&str]) -> IngressResult<T> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body).map_err(|_| {
            IngressError::InvalidRequest("Request body must be valid JSON".to_string())
        })?
    };

    let missing: Vec<String> = required
        .iter()
        .filter(|field| value.get(**field).is_none_or(Value::is_null))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IngressError::MissingFields(missing));
    }

    serde_json::from_value(value).map_err(|e| IngressError::InvalidRequest(e.to_string()))
}

/// Bearer token, else the `access_token` cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == ACCESS_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn require_token(headers: &HeaderMap) -> IngressResult<String> {
    session_token(headers).ok_or_else(|| IngressError::Unauthenticated("Not authenticated".to_string()))
}

/// RFC 6265 `cookie-octet`: visible ASCII other than DQUOTE, comma, semicolon or backslash
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

fn set_cookie(
    response: &mut Response,
    name: &str,
    value: &str,
    max_age_secs: u64,
    secure: bool,
) -> IngressResult<()> {
    if !value.bytes().all(is_cookie_octet) {
        return Err(IngressError::Internal(format!(
            "auth service returned an unusable {}",
            name
        )));
    }
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        name,
        value,
        max_age_secs,
        if secure { "; Secure" } else { "" }
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|_| IngressError::Internal(format!("auth service returned an unusable {}", name)))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        headers.insert(header::COOKIE, "access_token=from-cookie".parse().unwrap());
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_session_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; access_token=jwt-abc; refresh_token=r".parse().unwrap(),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("jwt-abc"));
    }

    #[test]
    fn test_session_token_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "access_token=".parse().unwrap());
        assert!(session_token(&headers).is_none());
        assert!(session_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_parse_json_missing_fields() {
        let err = parse_json::<LoginRequest>(&Bytes::from_static(br#"{"email":"a@b.com"}"#), &[
            "email", "password",
        ])
        .unwrap_err();
        assert!(matches!(err, IngressError::MissingFields(f) if f == vec!["password"]));
    }

    #[test]
    fn test_set_cookie_attributes() {
        let mut response = ok(json!({}));
        set_cookie(&mut response, ACCESS_COOKIE, "jwt", ACCESS_MAX_AGE_SECS, true).unwrap();
        let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("access_token=jwt;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_set_cookie_rejects_attribute_injection() {
        for value in [
            "jwt; Domain=evil.example",
            "jwt, other=1",
            "jwt Path=/admin",
            "\"quoted\"",
            "back\\slash",
            "tab\tvalue",
        ] {
            let mut response = ok(json!({}));
            let err = set_cookie(&mut response, ACCESS_COOKIE, value, ACCESS_MAX_AGE_SECS, false)
                .unwrap_err();
            assert!(matches!(err, IngressError::Internal(_)), "{}", value);
            assert!(response.headers().get(header::SET_COOKIE).is_none());
        }
    }

    #[test]
    fn test_set_cookie_accepts_jwt_and_empty() {
        let mut response = ok(json!({}));
        set_cookie(&mut response, ACCESS_COOKIE, "eyJhbGci.eyJzdWIi.sig-_=", 60, false).unwrap();
        set_cookie(&mut response, REFRESH_COOKIE, "", 0, false).unwrap();
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
