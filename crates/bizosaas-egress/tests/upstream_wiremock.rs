//! Integration tests for the upstream client using wiremock

use bizosaas_egress::{
    EgressError, ForwardHeaders, HttpClientConfig, UpstreamClient, UpstreamRequest,
};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

fn upstream(server: &MockServer, config: HttpClientConfig) -> UpstreamClient {
    UpstreamClient::new("brain", server.uri(), &config).unwrap()
}

#[tokio::test]
async fn test_get_forwards_query_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/brain/crm/leads"))
        .and(query_param("status", "new"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-tenant-domain", "admin.bizosaas.com"))
        .and(header("x-forwarded-host", "admin.bizosaas.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"leads": [], "total": 0})))
        .mount(&mock_server)
        .await;

    let client = upstream(&mock_server, HttpClientConfig::default());
    let request = UpstreamRequest::get("/api/brain/crm/leads")
        .with_query(Some("status=new".to_string()))
        .with_headers(
            ForwardHeaders::default()
                .with_authorization("Bearer test-token")
                .with_tenant_host("admin.bizosaas.com"),
        );

    let response = client.send(&request).await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.body["total"], json!(0));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/brain/crm/leads"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"email": "lead@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "lead-1"})))
        .mount(&mock_server)
        .await;

    let client = upstream(&mock_server, HttpClientConfig::default());
    let request = UpstreamRequest::post("/api/brain/crm/leads", json!({"email": "lead@example.com"}));

    let response = client.send(&request).await.unwrap();
    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.body["id"], json!("lead-1"));
}

#[tokio::test]
async fn test_non_2xx_returns_status_with_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/brain/billing/invoices"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .mount(&mock_server)
        .await;

    let client = upstream(&mock_server, HttpClientConfig::default());
    let err = client
        .send(&UpstreamRequest::get("/api/brain/billing/invoices"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_unavailable());
    assert_eq!(err.detail_message().as_deref(), Some("Token expired"));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let client = upstream(&mock_server, HttpClientConfig::default());
    let err = client
        .send(&UpstreamRequest::get("/anything"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_unavailable());
    assert!(err.detail_message().is_none());
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig {
        timeout_ms: 50,
        ..Default::default()
    };
    let client = upstream(&mock_server, config);
    let err = client.send(&UpstreamRequest::get("/slow")).await.unwrap_err();

    assert!(matches!(err, EgressError::Timeout(50)));
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = upstream(&mock_server, HttpClientConfig::default());
    let err = client.send(&UpstreamRequest::get("/html")).await.unwrap_err();
    assert!(matches!(err, EgressError::Decode(_)));
}

#[tokio::test]
async fn test_connection_refused() {
    // Nothing listens on port 9: connection refused
    let client =
        UpstreamClient::new("brain", "http://127.0.0.1:9", &HttpClientConfig::default()).unwrap();
    let err = client.send(&UpstreamRequest::get("/x")).await.unwrap_err();

    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_get_retries_on_bad_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig {
        max_retries: 1,
        ..Default::default()
    };
    let client = upstream(&mock_server, config);
    let response = client.send(&UpstreamRequest::get("/flaky")).await.unwrap();
    assert_eq!(response.body["ok"], json!(true));
}
