//! Assembles the gateway router

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware,
    routing::{get, post},
};
use bizosaas_observability::{HealthState, health_router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    REQUEST_ID_HEADER, request_context_middleware, security_headers_middleware,
    tenant_routing_middleware,
};
use crate::state::GatewayState;
use crate::{aggregate, auth_routes, bypass, proxy};

/// Full gateway: brain proxy, BFF auth, health endpoints and frontend bypass
///
/// The tenant host middleware wraps everything else, so `/` is rewritten
/// before any route is matched.
pub fn gateway_router(state: GatewayState) -> Router {
    let health = HealthState::with_readiness_checker(
        state.metrics.clone(),
        Arc::new(state.health.clone()),
    );
    let hosts = state.hosts.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    let routes = Router::new()
        .route(
            "/api/brain/dashboard/overview",
            get(aggregate::dashboard_overview),
        )
        .route(
            "/api/brain/{domain}/{*resource}",
            get(proxy::proxy_handler)
                .post(proxy::proxy_handler)
                .put(proxy::proxy_handler)
                .patch(proxy::proxy_handler)
                .delete(proxy::proxy_handler),
        )
        .route("/api/auth/login", post(auth_routes::login))
        .route("/api/auth/signup", post(auth_routes::signup))
        .route("/api/auth/logout", post(auth_routes::logout))
        .route("/api/auth/me", get(auth_routes::me))
        .route("/api/auth/tenants", get(auth_routes::tenants))
        .route("/api/auth/switch-tenant", post(auth_routes::switch_tenant))
        .fallback(bypass::frontend_fallback)
        .with_state(state)
        .merge(health_router(health))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Router::new()
        .fallback_service(routes)
        .layer(middleware::from_fn_with_state(hosts, tenant_routing_middleware))
}
