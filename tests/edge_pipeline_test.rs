//! End-to-end tests for the request-edge pipeline: rate limiting, session
//! propagation, and security header synthesis composed over the router.

mod common;

use axum::http::StatusCode;
use common::test_app::{BrokenSession, TestApp};
use forum_edge_service::presentation::middleware::{EdgeConfig, SecurityConfig};
use std::sync::Arc;

const CLIENT_A: [(&str, &str); 2] =
    [("x-forwarded-for", "203.0.113.10"), ("user-agent", "forum-client/1.0")];
const CLIENT_B: [(&str, &str); 2] =
    [("x-forwarded-for", "203.0.113.20"), ("user-agent", "forum-client/1.0")];

fn production_config() -> EdgeConfig {
    EdgeConfig::default()
}

#[tokio::test]
async fn api_tier_admits_100_then_rejects_the_101st() {
    let app = TestApp::new(production_config());

    for i in 0..100 {
        let response = app.get_with_headers("/api/anything", &CLIENT_A).await;
        assert_ne!(
            response.status,
            StatusCode::TOO_MANY_REQUESTS,
            "request {} should be admitted",
            i + 1
        );
    }

    let response = app.get_with_headers("/api/anything", &CLIENT_A).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.header("content-type"), Some("application/json"));

    let body = response.json();
    assert_eq!(body["error"], "Too Many Requests");
    assert!(body["resetAt"].as_str().is_some());
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn rejected_responses_carry_no_session_or_csp_headers() {
    let app = TestApp::new(production_config());

    let mut last = app.get_with_headers("/api/v1/auth/login", &CLIENT_A).await;
    for _ in 0..10 {
        last = app.get_with_headers("/api/v1/auth/login", &CLIENT_A).await;
    }

    assert_eq!(last.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(last.header("set-cookie").is_none());
    assert!(last.header("content-security-policy").is_none());
    assert!(last.header("x-nonce").is_none());
    assert!(last.header("strict-transport-security").is_none());
}

#[tokio::test]
async fn admitted_responses_carry_rate_limit_telemetry() {
    let app = TestApp::new(production_config());

    let first = app.get_with_headers("/api/anything", &CLIENT_A).await;
    assert_eq!(first.header("x-ratelimit-limit"), Some("100"));
    assert_eq!(first.header("x-ratelimit-remaining"), Some("99"));
    assert!(first.header("x-ratelimit-reset").is_some());

    let second = app.get_with_headers("/api/anything", &CLIENT_A).await;
    assert_eq!(second.header("x-ratelimit-remaining"), Some("98"));
}

#[tokio::test]
async fn clients_are_limited_independently() {
    let app = TestApp::new(production_config());

    // Exhaust the strict auth tier for client A
    for _ in 0..=10 {
        app.get_with_headers("/auth/login", &CLIENT_A).await;
    }
    let rejected = app.get_with_headers("/auth/login", &CLIENT_A).await;
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);

    let other = app.get_with_headers("/auth/login", &CLIENT_B).await;
    assert_ne!(other.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn static_asset_paths_never_hit_the_limiter() {
    let app = TestApp::new(production_config());

    for _ in 0..150 {
        let response = app.get_with_headers("/avatars/alice.png", &CLIENT_A).await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(response.header("x-ratelimit-limit").is_none());
        // The whole pipeline is bypassed, not just the limiter
        assert!(response.header("content-security-policy").is_none());
        assert!(response.header("set-cookie").is_none());
    }
}

#[tokio::test]
async fn prefetch_requests_bypass_the_pipeline() {
    let app = TestApp::new(production_config());
    let headers = [
        ("x-forwarded-for", "203.0.113.10"),
        ("user-agent", "forum-client/1.0"),
        ("purpose", "prefetch"),
    ];

    for _ in 0..150 {
        let response = app.get_with_headers("/api/anything", &headers).await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(response.header("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn page_responses_carry_csp_with_matching_nonce() {
    let app = TestApp::new(production_config());

    let response = app.get_with_headers("/forum/thread/42", &CLIENT_A).await;

    let csp = response.header("content-security-policy").expect("page CSP missing");
    let nonce = response.header("x-nonce").expect("nonce header missing");
    assert!(csp.contains(&format!("'nonce-{nonce}'")));
    assert!(!csp.contains("unsafe-eval"));

    assert!(response.header("strict-transport-security").is_some());
    assert_eq!(response.header("x-frame-options"), Some("DENY"));
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert!(response.header("permissions-policy").is_some());
}

#[tokio::test]
async fn nonce_is_fresh_per_request() {
    let app = TestApp::new(production_config());

    let first = app.get_with_headers("/forum/thread/1", &CLIENT_A).await;
    let second = app.get_with_headers("/forum/thread/1", &CLIENT_A).await;

    let nonce_a = first.header("x-nonce").unwrap();
    let nonce_b = second.header("x-nonce").unwrap();
    assert_ne!(nonce_a, nonce_b);
}

#[tokio::test]
async fn api_responses_use_the_narrow_header_set() {
    let app = TestApp::new(production_config());

    let response = app.get_with_headers("/api/v1/health", &CLIENT_A).await;
    assert_eq!(response.status, StatusCode::OK);

    assert!(response.header("content-security-policy").is_none());
    assert!(response.header("x-nonce").is_none());
    assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(
        response.header("access-control-allow-origin"),
        Some("https://forum.example.com")
    );
    assert_eq!(response.header("vary"), Some("Origin"));
}

#[tokio::test]
async fn admitted_responses_carry_refreshed_session_cookies() {
    let app = TestApp::new(production_config());

    let response = app.get_with_headers("/forum/thread/42", &CLIENT_A).await;
    assert_eq!(
        response.header("set-cookie"),
        Some("forum_session=refreshed; HttpOnly; Path=/")
    );
}

#[tokio::test]
async fn session_failure_degrades_to_unauthenticated_pass() {
    let app = TestApp::with_session(production_config(), Arc::new(BrokenSession));

    let response = app.get_with_headers("/forum/thread/42", &CLIENT_A).await;

    // Request still succeeds with full security headers, just no cookies
    assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_ne!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.header("set-cookie").is_none());
    assert!(response.header("content-security-policy").is_some());
}

#[tokio::test]
async fn development_mode_skips_rate_limiting_and_relaxes_csp() {
    let config = EdgeConfig {
        security: SecurityConfig { development_mode: true, ..SecurityConfig::default() },
        ..EdgeConfig::default()
    };
    let app = TestApp::new(config);

    for _ in 0..30 {
        let response = app.get_with_headers("/auth/login", &CLIENT_A).await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(response.header("x-ratelimit-limit").is_none());
    }

    let page = app.get_with_headers("/forum/thread/42", &CLIENT_A).await;
    let csp = page.header("content-security-policy").unwrap();
    assert!(csp.contains("'unsafe-eval'"));
}

#[tokio::test]
async fn disabled_rate_limiting_still_attaches_security_headers() {
    let config = EdgeConfig { rate_limiting_enabled: false, ..EdgeConfig::default() };
    let app = TestApp::new(config);

    for _ in 0..30 {
        let response = app.get_with_headers("/auth/login", &CLIENT_A).await;
        assert_ne!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(response.header("x-ratelimit-limit").is_none());
        assert!(response.header("content-security-policy").is_some());
    }
}
