//! Integration tests for the GraphQL executor's retry state machine.

use std::time::Instant;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopify_app_auth::{
    execute_graphql, ApiKey, ApiSecretKey, AppConfig, Code, GraphqlCall, HostUrl, ResponseEnvelope,
};

const GRAPHQL_PATH: &str = "/admin/api/2025-10/graphql.json";

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig::builder()
        .api_key(ApiKey::new("test-client-id").unwrap())
        .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
        .api_host(HostUrl::new(server.uri()).unwrap())
        .build()
        .unwrap()
}

fn shop_query() -> GraphqlCall {
    GraphqlCall::builder("query { shop { name } }")
        .shop("test-shop")
        .access_token("shpat_token")
        .api_version("2025-10")
        .build()
}

#[tokio::test]
async fn clean_200_returns_data_and_extensions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("X-Shopify-Access-Token", "shpat_token"))
        .and(body_partial_json(json!({ "query": "query { shop { name } }" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "shop": { "name": "Test Shop" } },
            "extensions": { "cost": { "requestedQueryCost": 1 } },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let success = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap();

    assert_eq!(success.data["shop"]["name"], "Test Shop");
    assert!(success.extensions.unwrap()["cost"]["requestedQueryCost"].is_number());
    assert_eq!(success.log.code, Code::Success);
    assert_eq!(success.http_logs.len(), 1);
}

#[tokio::test]
async fn graphql_errors_are_terminal_application_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Field 'shoop' doesn't exist" }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code, Code::GraphqlErrors);
    // The upstream 200 body is relayed for the caller to inspect
    assert_eq!(failure.response.status, 200);
    assert!(failure.response.body.contains("shoop"));
}

#[tokio::test]
async fn unauthorized_relays_the_invalid_token_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let retry_response = ResponseEnvelope::new(401)
        .with_header("X-Shopify-Retry-Invalid-Session-Request", "1");
    let call = GraphqlCall::builder("query { shop { name } }")
        .shop("test-shop")
        .access_token("shpat_token")
        .api_version("2025-10")
        .invalid_token_response(retry_response.clone())
        .build();

    let failure = execute_graphql(&config_for(&server), &call)
        .await
        .unwrap_err();

    assert_eq!(failure.log.code, Code::Unauthorized);
    assert_eq!(failure.response, retry_response);
}

#[tokio::test]
async fn unauthorized_without_invalid_token_response_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code, Code::Unauthorized);
    assert_eq!(failure.response.status, 401);
}

#[tokio::test]
async fn two_rate_limits_then_success_fits_the_default_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "shop": { "name": "Test Shop" } },
        })))
        .mount(&server)
        .await;

    let success = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap();

    assert_eq!(success.data["shop"]["name"], "Test Shop");
    assert_eq!(success.http_logs.len(), 3);
}

#[tokio::test]
async fn three_rate_limits_exhaust_the_default_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code, Code::RateLimited);
    assert_eq!(failure.response.status, 429);
    assert_eq!(failure.http_logs.len(), 3);
}

#[tokio::test]
async fn upstream_503_exhausts_backoff_and_surfaces_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let started = Instant::now();
    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code.to_string(), "http_error_503");
    assert_eq!(failure.response.status, 503);
    assert_eq!(failure.http_logs.len(), 3);
    // Two backoff sleeps: 500ms * 2^0 and 500ms * 2^1, plus jitter
    assert!(started.elapsed().as_millis() >= 1_500);
}

#[tokio::test]
async fn bad_request_is_terminal_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("syntax error"))
        .expect(1)
        .mount(&server)
        .await;

    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code, Code::HttpError(400));
    assert_eq!(failure.response.status, 400);
    assert_eq!(failure.http_logs.len(), 1);
}

#[tokio::test]
async fn forbidden_is_terminal_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code, Code::HttpError(403));
    assert!(failure.log.detail.contains("scope"));
}

#[tokio::test]
async fn unexpected_status_passes_through_with_specific_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(418).set_body_string("teapot"))
        .mount(&server)
        .await;

    let failure = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap_err();

    assert_eq!(failure.log.code.to_string(), "http_error_418");
    assert_eq!(failure.response.status, 418);
    assert_eq!(failure.response.body, "teapot");
}

#[tokio::test]
async fn network_error_fails_immediately() {
    let config = AppConfig::builder()
        .api_key(ApiKey::new("test-client-id").unwrap())
        .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
        .api_host(HostUrl::new("http://127.0.0.1:1").unwrap())
        .build()
        .unwrap();

    let failure = execute_graphql(&config, &shop_query()).await.unwrap_err();

    assert_eq!(failure.log.code, Code::NetworkError);
    assert_eq!(failure.response.status, 500);
    assert_eq!(failure.http_logs.len(), 1);
    assert!(failure.http_logs[0].response.is_none());
}

#[tokio::test]
async fn caller_headers_are_merged_over_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("X-GraphQL-Cost-Include-Fields", "true"))
        .and(header("X-Shopify-Access-Token", "shpat_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let call = GraphqlCall::builder("query { shop { name } }")
        .shop("test-shop")
        .access_token("shpat_token")
        .api_version("2025-10")
        .header("X-GraphQL-Cost-Include-Fields", "true")
        .build();

    assert!(execute_graphql(&config_for(&server), &call).await.is_ok());
}

#[tokio::test]
async fn attempt_logs_mask_the_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let success = execute_graphql(&config_for(&server), &shop_query())
        .await
        .unwrap();

    let attempt = &success.http_logs[0];
    assert_eq!(
        attempt.request.headers.get("X-Shopify-Access-Token").unwrap(),
        "*****"
    );
    // The query itself is fine to log
    assert!(attempt.request.body.as_ref().unwrap().contains("shop { name }"));
}
