//! Brain proxy behaviour against live, failing and unreachable upstreams

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bizosaas_integration_tests::{TestGateway, UNREACHABLE, get, post_json, send};
use regex::Regex;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_live_response_passes_through() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/saleor/products"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{"id": "p-1", "name": "Live product"}],
            "total": 1
        })))
        .expect(1)
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    let response = send(router, get("/api/brain/saleor/products?page=2")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], json!(true));
    assert_eq!(response.body["source"], json!("brain_gateway"));
    assert_eq!(response.body["products"][0]["name"], json!("Live product"));
    assert!(response.header("x-bizosaas-fallback").is_none());
}

#[tokio::test]
async fn test_upstream_status_is_preserved() {
    let brain = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/brain/crm/leads"))
        .and(body_json(json!({"email": "ada@example.com", "first_name": "Ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"lead": {"id": "lead-7"}})))
        .expect(1)
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    let response = send(
        router,
        post_json(
            "/api/brain/crm/leads",
            &json!({"email": "ada@example.com", "first_name": "Ada"}),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["lead"]["id"], json!("lead-7"));
    assert_eq!(response.body["source"], json!("brain_gateway"));
}

#[tokio::test]
async fn test_homepage_falls_back_when_brain_is_down() {
    let router = TestGateway::offline().router();
    let response = send(router, get("/api/brain/wagtail/homepage")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], json!(true));
    assert_eq!(response.body["source"], json!("fallback"));
    assert_eq!(
        response.body["homepage"]["title"],
        json!("Bizoholic - AI-Powered Marketing")
    );
    assert_eq!(response.header("x-bizosaas-fallback"), Some("connect_error"));
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/security/events"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    let response = send(router, get("/api/brain/security/events")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["source"], json!("fallback"));
    assert!(response.body["summary"]["threat_level"].is_string());
    assert_eq!(response.header("x-bizosaas-fallback"), Some("upstream_status"));
}

#[tokio::test]
async fn test_slow_upstream_times_out_into_fallback() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/tenant/dashboard"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"late": true}))
                .set_delay(std::time::Duration::from_millis(800)),
        )
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE)
        .with_timeout_ms(100)
        .router();
    let response = send(router, get("/api/brain/tenant/dashboard")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["source"], json!("fallback"));
    assert_eq!(response.header("x-bizosaas-fallback"), Some("timeout"));
}

#[tokio::test]
async fn test_referral_code_fallback_is_well_formed() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/brain/gamification/referrals/generate-code")
        .header("host", "bizoholic.com")
        .header("content-type", "application/json")
        .body(Body::from(json!({"campaign": "spring"}).to_string()))
        .unwrap();

    let response = send(TestGateway::offline().router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["source"], json!("fallback"));

    let code = response.body["referral_code"].as_str().unwrap();
    assert!(Regex::new(r"^[A-Z0-9-]+$").unwrap().is_match(code));

    let tracking_url = response.body["tracking_url"].as_str().unwrap();
    assert!(!tracking_url.is_empty());
    assert_eq!(tracking_url, format!("https://bizoholic.com/ref/{}", code));
    assert_eq!(response.body["campaign"], json!("spring"));
}

#[tokio::test]
async fn test_billing_never_serves_fallback() {
    let router = TestGateway::offline().router();
    let response = send(router, get("/api/brain/billing/invoices")).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.header("x-bizosaas-fallback").is_none());
    assert_eq!(response.body["error"]["type"], json!("upstream_unavailable"));
    assert!(response.body.get("invoices").is_none());
    assert!(!response.text.contains("127.0.0.1"));
    assert!(!response.text.contains("HTTP request failed"));
}

#[tokio::test]
async fn test_unknown_route_without_fallback_returns_bad_gateway() {
    let router = TestGateway::offline().router();
    let response = send(router, get("/api/brain/analytics/funnels")).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"]["code"], json!(502));
}

#[tokio::test]
async fn test_upstream_unauthorized_is_propagated() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/tenant/dashboard"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
        .expect(1)
        .mount(&brain)
        .await;

    let request = Request::builder()
        .uri("/api/brain/tenant/dashboard")
        .header("authorization", "Bearer stale")
        .body(Body::empty())
        .unwrap();
    let response = send(TestGateway::new(brain.uri(), UNREACHABLE).router(), request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"]["type"], json!("unauthenticated"));
    assert_eq!(response.body["error"]["message"], json!("Token expired"));
    assert!(response.header("x-bizosaas-fallback").is_none());
}

#[tokio::test]
async fn test_upstream_forbidden_is_propagated() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/crm/leads"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": "Not your tenant"})))
        .mount(&brain)
        .await;

    let response = send(
        TestGateway::new(brain.uri(), UNREACHABLE).router(),
        get("/api/brain/crm/leads"),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"]["message"], json!("Not your tenant"));
}

#[tokio::test]
async fn test_upstream_client_error_keeps_detail() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/directory/businesses"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"detail": [{"msg": "category is invalid"}]})),
        )
        .mount(&brain)
        .await;

    let response = send(
        TestGateway::new(brain.uri(), UNREACHABLE).router(),
        get("/api/brain/directory/businesses?category=unknown"),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["type"], json!("upstream_error"));
    assert_eq!(response.body["error"]["message"], json!("category is invalid"));
}

#[tokio::test]
async fn test_missing_lead_fields_rejected_before_upstream() {
    let brain = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/brain/crm/leads"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    let response = send(
        router,
        post_json("/api/brain/crm/leads", &json!({"email": "ada@example.com"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["type"], json!("invalid_request"));
    assert_eq!(response.body["error"]["missing_fields"], json!(["first_name"]));
}

#[tokio::test]
async fn test_invalid_json_body_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/brain/crm/leads")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(TestGateway::offline().router(), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["error"]["message"],
        json!("Invalid request: Request body must be valid JSON")
    );
}

#[tokio::test]
async fn test_request_id_is_echoed_and_forwarded() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/crm/leads"))
        .and(header("x-request-id", "req-from-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"leads": []})))
        .expect(1)
        .mount(&brain)
        .await;

    let request = Request::builder()
        .uri("/api/brain/crm/leads")
        .header("x-request-id", "req-from-client")
        .body(Body::empty())
        .unwrap();
    let response = send(TestGateway::new(brain.uri(), UNREACHABLE).router(), request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-request-id"), Some("req-from-client"));
}

#[tokio::test]
async fn test_configured_route_gets_its_fallback() {
    use bizosaas_routing::{RouteSpec, RouteTable};

    let mut routes = RouteTable::with_defaults();
    routes
        .insert(
            RouteSpec::get("/crm/leads/recent/")
                .with_upstream_path("/api/v2/leads/recent")
                .with_fallback("crm.leads"),
        )
        .unwrap();

    let router = TestGateway::offline().with_routes(routes).router();
    let response = send(router, get("/api/brain/crm/leads/recent")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["source"], json!("fallback"));
    assert!(response.body["leads"].is_array());
}

#[tokio::test]
async fn test_relative_segments_cannot_leave_brain_prefix() {
    let brain = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"secret": "internal"})))
        .expect(0)
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    for uri in [
        "/api/brain/x/%2e%2e/%2e%2e/%2e%2e/internal/admin",
        "/api/brain/x/../../../internal/admin",
        "/api/brain/x/..%2F..%2F..%2Finternal%2Fadmin",
        "/api/brain/x/%252e%252e/internal",
    ] {
        let response = send(router.clone(), get(uri)).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.body["error"]["type"], json!("invalid_request"));
        assert!(!response.text.contains("internal\""));
    }
}

#[tokio::test]
async fn test_put_and_delete_forward_json_body() {
    let brain = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/brain/crm/leads/lead-7"))
        .and(body_json(json!({"status": "qualified"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lead": {"status": "qualified"}})))
        .expect(1)
        .mount(&brain)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/brain/crm/leads/lead-7"))
        .and(body_json(json!({"reason": "duplicate"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
        .expect(1)
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();

    let put = Request::builder()
        .method("PUT")
        .uri("/api/brain/crm/leads/lead-7")
        .header("content-type", "application/json")
        .body(Body::from(json!({"status": "qualified"}).to_string()))
        .unwrap();
    let response = send(router.clone(), put).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["lead"]["status"], json!("qualified"));

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/brain/crm/leads/lead-7")
        .header("content-type", "application/json")
        .body(Body::from(json!({"reason": "duplicate"}).to_string()))
        .unwrap();
    let response = send(router, delete).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["deleted"], json!(true));
}

#[tokio::test]
async fn test_live_payload_drift_is_counted_not_blocked() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/wagtail/homepage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"homepage": {"title": "Spring sale"}})),
        )
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    let response = send(router.clone(), get("/api/brain/wagtail/homepage")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["source"], json!("brain_gateway"));
    assert_eq!(response.body["homepage"]["title"], json!("Spring sale"));

    let metrics = send(router, get("/metrics")).await;
    assert!(
        metrics
            .text
            .contains(r#"bizosaas_schema_drift_total{route="wagtail/homepage"} 1"#)
    );
}

#[tokio::test]
async fn test_complete_live_payload_has_no_drift() {
    let brain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/brain/crm/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"leads": [], "total": 0})))
        .mount(&brain)
        .await;

    let router = TestGateway::new(brain.uri(), UNREACHABLE).router();
    send(router.clone(), get("/api/brain/crm/leads")).await;

    let metrics = send(router, get("/metrics")).await;
    assert!(!metrics.text.contains(r#"bizosaas_schema_drift_total{route="crm/leads"}"#));
}
