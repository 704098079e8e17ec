//! Single-upstream routes, account deletion events, health and middleware.

mod common;

use std::time::Duration;

use axum::http::Method;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{dead_url, start_gateway, start_gateway_with, MockUpstream};

#[tokio::test]
async fn test_delete_publishes_one_event() {
    let auth = MockUpstream::start().await;
    let orchestrator = MockUpstream::start().await;
    auth.respond(Method::DELETE, "/accounts/bob", 200, r#"{"deleted":true}"#);
    orchestrator.respond(Method::POST, "/orchestrator/user-deleted", 202, "{}");

    let gw = start_gateway(&auth.url(), &dead_url().await, &orchestrator.url()).await;
    let res = gw
        .client
        .delete(gw.endpoint("/api/v1/users/bob"))
        .header("Authorization", "Bearer t")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), r#"{"deleted":true}"#);

    orchestrator.wait_for_requests(1, Duration::from_secs(3)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = orchestrator.requests();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].method, Method::POST);
    assert_eq!(events[0].path, "/orchestrator/user-deleted");
    assert_eq!(events[0].headers["authorization"], "Bearer t");

    let event = events[0].json();
    assert_eq!(event["type"], "user.deleted");
    assert_eq!(event["data"], json!({"username": "bob"}));
    assert_eq!(event["meta"]["source"], "api-gateway");
}

#[tokio::test]
async fn test_delete_succeeds_with_orchestrator_down() {
    let auth = MockUpstream::start().await;
    auth.respond(Method::DELETE, "/accounts/bob", 200, r#"{"deleted":true}"#);

    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;
    let res = gw
        .client
        .delete(gw.endpoint("/api/v1/users/bob"))
        .header("Authorization", "Bearer t")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_delete_publishes_nothing() {
    let auth = MockUpstream::start().await;
    let orchestrator = MockUpstream::start().await;
    auth.respond(Method::DELETE, "/accounts/bob", 403, r#"{"error":"forbidden"}"#);

    let gw = start_gateway(&auth.url(), &dead_url().await, &orchestrator.url()).await;
    let res = gw
        .client
        .delete(gw.endpoint("/api/v1/users/bob"))
        .header("Authorization", "Bearer t")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(orchestrator.requests().is_empty());
}

#[tokio::test]
async fn test_delete_requires_credential() {
    let auth = MockUpstream::start().await;

    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;
    let res = gw
        .client
        .delete(gw.endpoint("/api/v1/users/bob"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(auth.requests().is_empty());
}

#[tokio::test]
async fn test_login_is_forwarded_verbatim() {
    let auth = MockUpstream::start().await;
    auth.respond(Method::POST, "/sessions", 201, r#"{"token":"abc"}"#);

    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;
    let res = gw
        .client
        .post(gw.endpoint("/api/v1/auth/login"))
        .json(&json!({"username": "alice", "password": "pw"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"token": "abc"}));

    let seen = auth.requests_to(Method::POST, "/sessions");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].json(), json!({"username": "alice", "password": "pw"}));
}

#[tokio::test]
async fn test_register_relays_upstream_error() {
    let auth = MockUpstream::start().await;
    auth.respond(Method::POST, "/accounts", 409, r#"{"error":"username taken"}"#);

    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;
    let res = gw
        .client
        .post(gw.endpoint("/api/v1/auth/register"))
        .json(&json!({"username": "alice"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.text().await.unwrap(), r#"{"error":"username taken"}"#);
}

#[tokio::test]
async fn test_login_with_auth_down_is_unavailable() {
    let gw = start_gateway(&dead_url().await, &dead_url().await, &dead_url().await).await;
    let res = gw
        .client
        .post(gw.endpoint("/api/v1/auth/login"))
        .json(&json!({"username": "alice", "password": "pw"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Service unavailable"}));
}

#[tokio::test]
async fn test_search_passes_query_through() {
    let profile = MockUpstream::start().await;
    profile.respond(Method::GET, "/profiles/search", 200, r#"{"results":[]}"#);

    let gw = start_gateway(&dead_url().await, &profile.url(), &dead_url().await).await;
    let res = gw
        .client
        .get(gw.endpoint("/api/v1/profiles/search?query=ali&limit=5"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let seen = profile.requests_to(Method::GET, "/profiles/search");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].query.as_deref(), Some("query=ali&limit=5"));
}

#[tokio::test]
async fn test_own_profile_routes() {
    let profile = MockUpstream::start().await;
    profile.respond(Method::GET, "/profiles/me", 200, r#"{"bio":"hello"}"#);
    profile.respond(Method::PUT, "/profiles/me", 200, r#"{"bio":"updated"}"#);
    profile.respond(Method::GET, "/profiles/stats/me", 200, r#"{"views":3}"#);

    let gw = start_gateway(&dead_url().await, &profile.url(), &dead_url().await).await;

    let unauthenticated = gw
        .client
        .get(gw.endpoint("/api/v1/profiles/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
    assert!(profile.requests().is_empty());

    let read = gw
        .client
        .get(gw.endpoint("/api/v1/profiles/me"))
        .header("Authorization", "Bearer t")
        .send()
        .await
        .unwrap();
    assert_eq!(read.json::<Value>().await.unwrap(), json!({"bio": "hello"}));

    let update = gw
        .client
        .put(gw.endpoint("/api/v1/profiles/me"))
        .header("Authorization", "Bearer t")
        .json(&json!({"bio": "updated"}))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::OK);
    let put = profile.requests_to(Method::PUT, "/profiles/me");
    assert_eq!(put[0].json(), json!({"bio": "updated"}));

    let stats = gw
        .client
        .get(gw.endpoint("/api/v1/profiles/stats/me"))
        .header("Authorization", "Bearer t")
        .send()
        .await
        .unwrap();
    assert_eq!(stats.json::<Value>().await.unwrap(), json!({"views": 3}));
}

#[tokio::test]
async fn test_public_profile_needs_no_credential() {
    let profile = MockUpstream::start().await;
    profile.respond(Method::GET, "/profiles/carol", 200, r#"{"nickname":"cc"}"#);

    let gw = start_gateway(&dead_url().await, &profile.url(), &dead_url().await).await;
    let res = gw
        .client
        .get(gw.endpoint("/api/v1/profiles/carol"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"nickname": "cc"}));
}

#[tokio::test]
async fn test_health_lists_upstreams() {
    let auth = MockUpstream::start().await;
    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;

    let res = gw.client.get(gw.endpoint("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "UP");
    assert_eq!(body["service"], "api-gateway");
    assert!(body["timestamp"].is_string());
    assert!(body["upstreams"]["auth"]
        .as_str()
        .unwrap()
        .starts_with(&auth.url()));
    assert!(body["upstreams"]["profiles"].is_string());
    assert!(body["upstreams"]["orchestrator"].is_string());
    assert!(auth.requests().is_empty());
}

#[tokio::test]
async fn test_cors_preflight_is_answered_locally() {
    let auth = MockUpstream::start().await;
    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;

    let res = gw
        .client
        .request(
            reqwest::Method::OPTIONS,
            gw.endpoint("/api/v1/users/alice/profile"),
        )
        .header("Origin", "http://app.example.com")
        .header("Access-Control-Request-Method", "PATCH")
        .header("Access-Control-Request-Headers", "authorization, content-type")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let methods = res.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("PATCH"));
    assert!(auth.requests().is_empty());
}

#[tokio::test]
async fn test_request_id_reaches_upstream_and_client() {
    let auth = MockUpstream::start().await;
    auth.respond(Method::POST, "/sessions", 200, "{}");

    let gw = start_gateway(&auth.url(), &dead_url().await, &dead_url().await).await;
    let res = gw
        .client
        .post(gw.endpoint("/api/v1/auth/login"))
        .header("x-request-id", "req-42")
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "req-42");
    let seen = auth.requests_to(Method::POST, "/sessions");
    assert_eq!(seen[0].headers["x-request-id"], "req-42");

    let generated = gw
        .client
        .post(gw.endpoint("/api/v1/auth/login"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert!(generated.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_forwarding() {
    let auth = MockUpstream::start().await;
    auth.respond(Method::POST, "/sessions", 200, "{}");

    let gw = start_gateway_with(&auth.url(), &dead_url().await, &dead_url().await, |config| {
        config.limits.max_body_bytes = 1024;
    })
    .await;
    let res = gw
        .client
        .post(gw.endpoint("/api/v1/auth/login"))
        .header("Origin", "http://app.example.com")
        .header("Content-Type", "application/json")
        .body(vec![b' '; 4096])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert!(auth.requests().is_empty());
}
