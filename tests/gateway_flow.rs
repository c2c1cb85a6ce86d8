//! End-to-end request flows through the gateway.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use edge_gateway::config::{FilterConfig, GatewayConfig, RouteConfig, UpstreamConfig};
use edge_gateway::token::{Claims, TokenCategory, TokenCodec};
use serde_json::Value;

mod common;

use common::{client, raw_body, raw_header, request_line, start_gateway, MockResponse};

const SECRET: &str = "integration-secret";
const UNAUTHORIZED: &str = r#"{"status": 401, "message": "UNAUTHORIZED", "details": "UNAUTHORIZED"}"#;

fn token(subject: &str, role: &str, ttl_secs: i64) -> String {
    let now = jsonwebtoken::get_current_timestamp();
    let claims = Claims::new(
        subject,
        role,
        TokenCategory::Access,
        now.saturating_sub(3600),
        now.saturating_add_signed(ttl_secs),
    );
    TokenCodec::new(SECRET, 0).sign(&claims).unwrap()
}

fn route(id: &str, paths: &[&str], methods: &[&str], filters: Vec<FilterConfig>) -> RouteConfig {
    RouteConfig {
        id: id.into(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        upstream: "books".into(),
        priority: 0,
        filters,
    }
}

fn config(backend: SocketAddr, auth: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.jwt.secret = SECRET.into();
    config.hashing.cost = 4;
    config.observability.metrics_enabled = false;
    config.upstreams = vec![
        UpstreamConfig { name: "books".into(), addresses: vec![backend.to_string()] },
        UpstreamConfig { name: "auth".into(), addresses: vec![auth.to_string()] },
    ];
    config.routes = vec![
        // Generic route declared first on purpose: precedence must not depend on order.
        route("books", &["/api/books/**", "/api/members/**"], &[], vec![FilterConfig::Authenticate]),
        route(
            "member-register",
            &["/api/members"],
            &["POST"],
            vec![FilterConfig::HashPassword { parent: None, guard: Some("name".into()) }],
        ),
        route(
            "customer-order",
            &["/api/orders/customer"],
            &["POST"],
            vec![FilterConfig::HashPassword { parent: Some("customerRegister".into()), guard: None }],
        ),
        route("admin", &["/admin/api/**"], &[], vec![FilterConfig::AuthorizeAdmin { strip_prefix: 1 }]),
    ];
    config
}

/// Auth upstream that counts calls and always hands out `access`.
async fn start_auth(access: String, calls: Arc<AtomicUsize>) -> SocketAddr {
    common::start_programmable_backend(move |request| {
        let access = access.clone();
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            assert!(request_line(&request).starts_with("POST /api/auth/reissue "));
            MockResponse::new(200)
                .with_header("Authorization", &format!("Bearer {access}"))
                .with_header("Set-Cookie", "Refresh=new-refresh; Path=/; HttpOnly")
        }
    })
    .await
}

#[tokio::test]
async fn test_valid_token_injects_identity() {
    let backend = common::start_echo_backend().await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    let response = client()
        .get(format!("http://{gateway}/api/books/7"))
        .bearer_auth(token("alice", "ROLE_MEMBER", 600))
        .header("X-USER-ID", "mallory")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let seen = response.text().await.unwrap();
    assert!(request_line(&seen).starts_with("GET /api/books/7 "));
    assert_eq!(raw_header(&seen, "x-user-id").as_deref(), Some("alice"));
    assert_eq!(raw_header(&seen, "x-user-role").as_deref(), Some("ROLE_MEMBER"));
}

#[tokio::test]
async fn test_invalid_token_gets_fixed_401() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let backend = common::start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { MockResponse::ok("should not be reached") }
    })
    .await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    let forged = TokenCodec::new("someone-else", 0)
        .sign(&Claims::new("alice", "ROLE_MEMBER", TokenCategory::Access, 0, u64::MAX / 2))
        .unwrap();

    for bad in [forged.as_str(), "definitely.not.ajwt"] {
        let response = client()
            .get(format!("http://{gateway}/api/books/7"))
            .bearer_auth(bad)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 401);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.text().await.unwrap(), UNAUTHORIZED);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_token_reissued_transparently() {
    let fresh = token("alice", "ROLE_MEMBER", 600);
    let calls = Arc::new(AtomicUsize::new(0));
    let auth = start_auth(fresh.clone(), calls.clone()).await;
    let backend = common::start_echo_backend().await;
    let (gateway, _shutdown) = start_gateway(config(backend, auth)).await;

    let response = client()
        .get(format!("http://{gateway}/api/members/123"))
        .bearer_auth(token("alice", "ROLE_MEMBER", -60))
        .header("Refresh", "old-refresh")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.headers()["authorization"], format!("Bearer {fresh}").as_str());
    assert_eq!(response.headers()["set-cookie"], "Refresh=new-refresh; Path=/; HttpOnly");

    let seen = response.text().await.unwrap();
    assert_eq!(raw_header(&seen, "authorization"), Some(format!("Bearer {fresh}")));
    assert_eq!(raw_header(&seen, "refresh").as_deref(), Some("new-refresh"));
    assert_eq!(raw_header(&seen, "x-user-id").as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_failed_reissue_is_401() {
    let backend = common::start_echo_backend().await;
    let auth = common::start_programmable_backend(|_| async { MockResponse::new(401) }).await;
    let (gateway, _shutdown) = start_gateway(config(backend, auth)).await;

    let response = client()
        .get(format!("http://{gateway}/api/books/1"))
        .bearer_auth(token("alice", "ROLE_MEMBER", -60))
        .header("Refresh", "stale")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), UNAUTHORIZED);
}

/// Backend that only counts how often it is reached.
async fn start_counting_backend(hits: Arc<AtomicUsize>) -> SocketAddr {
    common::start_programmable_backend(move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
        async { MockResponse::ok("should not be reached") }
    })
    .await
}

async fn assert_expired_token_rejected(gateway: SocketAddr) {
    let response = client()
        .get(format!("http://{gateway}/api/books/1"))
        .bearer_auth(token("alice", "ROLE_MEMBER", -60))
        .header("Refresh", "old-refresh")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), UNAUTHORIZED);
}

#[tokio::test]
async fn test_slow_reissue_is_401() {
    let hits = Arc::new(AtomicUsize::new(0));
    let backend = start_counting_backend(hits.clone()).await;
    let fresh = token("alice", "ROLE_MEMBER", 600);
    let auth = common::start_programmable_backend(move |_| {
        let fresh = fresh.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            MockResponse::new(200).with_header("Authorization", &format!("Bearer {fresh}"))
        }
    })
    .await;

    let mut config = config(backend, auth);
    config.auth.reissue_timeout_ms = 200;
    let (gateway, _shutdown) = start_gateway(config).await;

    let started = Instant::now();
    assert_expired_token_rejected(gateway).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_auth_upstream_is_401() {
    let hits = Arc::new(AtomicUsize::new(0));
    let backend = start_counting_backend(hits.clone()).await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    assert_expired_token_rejected(gateway).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_foreign_authorization_scheme_is_401() {
    let hits = Arc::new(AtomicUsize::new(0));
    let backend = start_counting_backend(hits.clone()).await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    let response = client()
        .get(format!("http://{gateway}/api/books/1"))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unfiltered_body_streams_past_buffer_limit() {
    let backend = common::start_echo_backend().await;
    let mut config = config(backend, common::closed_port().await);
    config.listener.max_body_bytes = 16;
    let (gateway, _shutdown) = start_gateway(config).await;

    let payload = "x".repeat(1024);
    let response = client()
        .put(format!("http://{gateway}/api/books/1"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let seen = response.text().await.unwrap();
    assert_eq!(raw_body(&seen), payload);

    // The rewriting route still enforces the limit.
    let response = client()
        .post(format!("http://{gateway}/api/members"))
        .body(format!(r#"{{"name":"kim","password":"{payload}"}}"#))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
}

#[tokio::test]
async fn test_signup_password_hashed_and_precedence() {
    let backend = common::start_echo_backend().await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    let response = client()
        .post(format!("http://{gateway}/api/members"))
        .header("content-type", "application/json")
        .body(r#"{"name":"kim","username":"kim01","password":"pw1234","age":30}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let seen = response.text().await.unwrap();
    let body: Value = serde_json::from_str(raw_body(&seen)).unwrap();
    let hashed = body["password"].as_str().unwrap();
    assert!(hashed.starts_with("$2a$"));
    assert!(bcrypt::verify("pw1234", hashed).unwrap());
    assert_eq!(body["name"], "kim");
    assert_eq!(body["username"], "kim01");
    assert_eq!(body["age"], 30);
    let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["name", "username", "password", "age"]);

    // Same prefix, other method: generic member route, body untouched.
    let response = client()
        .get(format!("http://{gateway}/api/members/123"))
        .send()
        .await
        .unwrap();
    let seen = response.text().await.unwrap();
    assert!(request_line(&seen).starts_with("GET /api/members/123 "));
    assert!(raw_header(&seen, "x-user-id").is_none());
}

#[tokio::test]
async fn test_nested_password_and_bad_json() {
    let backend = common::start_echo_backend().await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    let response = client()
        .post(format!("http://{gateway}/api/orders/customer"))
        .body(r#"{"items":[1,2],"customerRegister":{"email":"a@b.c","password":"secret"}}"#)
        .send()
        .await
        .unwrap();
    let seen = response.text().await.unwrap();
    let body: Value = serde_json::from_str(raw_body(&seen)).unwrap();
    assert!(body["customerRegister"]["password"].as_str().unwrap().starts_with("$2a$"));
    assert_eq!(body["customerRegister"]["email"], "a@b.c");
    assert_eq!(body["items"], serde_json::json!([1, 2]));

    let response = client()
        .post(format!("http://{gateway}/api/members"))
        .body("name=kim&password=pw")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "INTERNAL_SERVER_ERROR");
}

#[tokio::test]
async fn test_admin_route_strips_prefix() {
    let backend = common::start_echo_backend().await;
    let (gateway, _shutdown) = start_gateway(config(backend, common::closed_port().await)).await;

    let response = client()
        .get(format!("http://{gateway}/admin/api/books?page=2"))
        .bearer_auth(token("root", "ROLE_ADMIN", 600))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let seen = response.text().await.unwrap();
    assert!(request_line(&seen).starts_with("GET /api/books?page=2 "));

    let response = client()
        .get(format!("http://{gateway}/admin/api/books"))
        .bearer_auth(token("alice", "ROLE_MEMBER", 600))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(response.text().await.unwrap(), UNAUTHORIZED);
}

#[tokio::test]
async fn test_gateway_errors() {
    let (gateway, shutdown) =
        start_gateway(config(common::closed_port().await, common::closed_port().await)).await;

    let response = client().get(format!("http://{gateway}/nowhere")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], 404);
    assert_eq!(body["message"], "NOT_FOUND");

    let response = client().get(format!("http://{gateway}/api/books")).send().await.unwrap();
    assert_eq!(response.status(), 502);

    shutdown.trigger();
}
