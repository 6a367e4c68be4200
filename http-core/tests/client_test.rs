mod fixtures;
use fixtures::*;

use pilot_http::client::RequestOptions;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

#[tokio::test]
async fn test_retries_retryable_status_until_success() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .with_priority(2)
        .mount(&server)
        .await;

    let mut client = test_client(&server, 5);
    let outcome = client
        .get(&format!("{}/flaky", server.uri()), RequestOptions::default())
        .await;

    assert!(outcome.transport_completed);
    let response = outcome.response.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
    assert_eq!(requests_to(&server, "/flaky").await, 4);
}

#[tokio::test]
async fn test_always_429_exhausts_retries() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let mut client = test_client(&server, 4);
    let outcome = client
        .post(&format!("{}/limited", server.uri()), RequestOptions::default())
        .await;

    assert!(!outcome.transport_completed);
    assert!(outcome.response.is_none());
    assert_eq!(requests_to(&server, "/limited").await, 4);
}

#[tokio::test]
async fn test_non_retryable_status_returns_immediately() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/unimplemented"))
        .respond_with(ResponseTemplate::new(501))
        .mount(&server)
        .await;

    let mut client = test_client(&server, 5);

    let outcome = client
        .get(&format!("{}/missing", server.uri()), RequestOptions::default())
        .await;
    assert!(outcome.transport_completed);
    assert_eq!(outcome.response.unwrap().status, 404);

    let outcome = client
        .get(&format!("{}/unimplemented", server.uri()), RequestOptions::default())
        .await;
    assert!(outcome.transport_completed);
    assert_eq!(outcome.response.unwrap().status, 501);

    assert_eq!(requests_to(&server, "/missing").await, 1);
    assert_eq!(requests_to(&server, "/unimplemented").await, 1);
}

#[tokio::test]
async fn test_transport_errors_are_retried_then_exhausted() {
    setup_tracing();
    let server = MockServer::start().await;

    // nothing listens on the discard port
    let mut client = test_client(&server, 3);
    let outcome = client
        .get("http://127.0.0.1:9/unreachable", RequestOptions::default())
        .await;

    assert!(!outcome.transport_completed);
    assert!(outcome.response.is_none());
}

#[tokio::test]
async fn test_request_options_are_applied() {
    setup_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(query_param("key", "abc"))
        .and(header("x-test", "1"))
        .and(body_json(json!({ "hello": "world" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let mut client = test_client(&server, 2);
    let outcome = client
        .post(
            &format!("{}/echo", server.uri()),
            RequestOptions::default()
                .query("key", "abc")
                .header("x-test", "1")
                .json(json!({ "hello": "world" })),
        )
        .await;

    let response = outcome.response.unwrap();
    assert_eq!(response.status, 201);
    assert!(response.is_success());
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["ok"], true);
}
