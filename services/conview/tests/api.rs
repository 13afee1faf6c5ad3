//! End-to-end tests driving the full router over the in-memory store

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use conview::{
    AppState, create_router,
    rate_limiter::{MemoryCounterStore, RateLimiter, RateLimiterConfig},
};

const WINDOW: Duration = Duration::from_secs(15 * 60);

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
    text: String,
}

fn app() -> Router {
    let counters = Arc::new(MemoryCounterStore::new());
    let state = AppState::in_memory(
        RateLimiter::new(RateLimiterConfig::auth(5, WINDOW), counters.clone()),
        RateLimiter::new(RateLimiterConfig::api(100, WINDOW), counters),
    );
    let static_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/static");
    create_router(state, &static_dir)
}

async fn send_from(
    app: &Router,
    client: [u8; 4],
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let mut request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((client, 40000))));

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&bytes).into_owned();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
        text,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    send_from(app, [127, 0, 0, 1], method, uri, body).await
}

/// Register from a dedicated address so the login budget stays untouched
async fn register(app: &Router, username: &str, password: &str) -> TestResponse {
    send_from(
        app,
        [10, 0, 0, 1],
        Method::POST,
        "/register",
        Some(json!({ "username": username, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_register_login_post_and_delete_flow() {
    let app = app();

    let registered = register(&app, "alice", "secret1").await;
    assert_eq!(registered.status, StatusCode::OK);
    assert_eq!(registered.body["success"], true);
    assert_eq!(registered.body["message"], "Registration successful");

    let login = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["username"], "alice");
    assert_eq!(login.body["user"]["online"], true);
    assert!(!login.text.contains("password"));

    let updated = send(
        &app,
        Method::PUT,
        "/api/users/alice",
        Some(json!({ "bio": "Love reading", "relation": "Married" })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["user"]["bio"], "Love reading");
    assert_eq!(updated.body["user"]["statusvalue"], "Online");

    let created = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(json!({ "username": "alice", "content": "Hello" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["post"]["authorUsername"], "alice");
    let post_id = created.body["post"]["id"].as_str().unwrap().to_string();

    let feed = send(&app, Method::GET, "/api/posts?username=alice", None).await;
    assert_eq!(feed.status, StatusCode::OK);
    let posts = feed.body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["content"], "Hello");
    assert_eq!(posts[0]["author"]["username"], "alice");

    register(&app, "bob", "secret2").await;
    let refused = send(
        &app,
        Method::DELETE,
        &format!("/api/posts/{post_id}"),
        Some(json!({ "username": "bob" })),
    )
    .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
    assert_eq!(refused.body["message"], "Not authorized to delete this post");

    let deleted = send(
        &app,
        Method::DELETE,
        &format!("/api/posts/{post_id}"),
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Post deleted");

    let logout = send(
        &app,
        Method::POST,
        "/logout",
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(logout.status, StatusCode::OK);
    let profile = send(&app, Method::GET, "/api/users/alice", None).await;
    assert_eq!(profile.body["user"]["online"], false);
}

#[tokio::test]
async fn test_registration_conflicts_and_validation() {
    let app = app();

    assert_eq!(register(&app, "alice", "secret1").await.status, StatusCode::OK);

    let duplicate = register(&app, "alice", "another1").await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["message"], "Username already exists");

    let invalid = register(&app, "al", "secret1").await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["success"], false);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app();
    register(&app, "alice", "secret1").await;

    let unknown = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "nobody", "password": "secret1" })),
    )
    .await;
    let wrong = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, wrong.status);
    assert_eq!(unknown.body, wrong.body);
}

#[tokio::test]
async fn test_sixth_login_is_rate_limited_before_the_service() {
    let app = app();
    register(&app, "alice", "secret1").await;

    let attacker = [192, 168, 1, 50];
    for _ in 0..5 {
        let attempt = send_from(
            &app,
            attacker,
            Method::POST,
            "/login",
            Some(json!({ "username": "alice", "password": "guess123" })),
        )
        .await;
        assert_eq!(attempt.status, StatusCode::UNAUTHORIZED);
    }

    let limited = send_from(
        &app,
        attacker,
        Method::POST,
        "/login",
        Some(json!({ "username": "alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        limited.body["message"],
        "Too many attempts, please try again later."
    );
    assert!(limited.headers.contains_key(header::RETRY_AFTER));

    // The correct password never reached the login service
    let profile = send(&app, Method::GET, "/api/users/alice", None).await;
    assert_eq!(profile.body["user"]["online"], false);

    // Other clients keep their own budget
    let other = send(
        &app,
        Method::POST,
        "/login",
        Some(json!({ "username": "alice", "password": "secret1" })),
    )
    .await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_responses_carry_rate_limit_headers() {
    let app = app();

    let response = send(&app, Method::GET, "/api/users", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["x-ratelimit-limit"], "100");
    assert_eq!(response.headers["x-ratelimit-remaining"], "99");

    let health = send(&app, Method::GET, "/api/health", None).await;
    assert!(!health.headers.contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn test_user_listing_never_exposes_passwords() {
    let app = app();
    register(&app, "alice", "secret1").await;
    register(&app, "bob", "secret2").await;

    let response = send(&app, Method::GET, "/api/users", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["users"].as_array().unwrap().len(), 2);
    assert!(!response.text.contains("password"));
    assert!(!response.text.contains("argon2"));
}

#[tokio::test]
async fn test_friends_likes_and_comments() {
    let app = app();
    register(&app, "alice", "secret1").await;
    register(&app, "bob", "secret2").await;

    let added = send(
        &app,
        Method::POST,
        "/api/users/alice/friends",
        Some(json!({ "friendUsername": "bob" })),
    )
    .await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.body["message"], "Friend added");

    let friends = send(&app, Method::GET, "/api/users/alice/friends", None).await;
    assert_eq!(friends.body["friends"][0]["username"], "bob");
    assert!(friends.body["friends"][0].get("passwordHash").is_none());

    let missing = send(
        &app,
        Method::POST,
        "/api/users/alice/friends",
        Some(json!({ "friendUsername": "ghost" })),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let created = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(json!({ "username": "alice", "content": "Hello" })),
    )
    .await;
    let post_id = created.body["post"]["id"].as_str().unwrap().to_string();

    let liked = send(
        &app,
        Method::POST,
        &format!("/api/posts/{post_id}/likes"),
        Some(json!({ "username": "bob" })),
    )
    .await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.body["post"]["likes"].as_array().unwrap().len(), 1);

    let commented = send(
        &app,
        Method::POST,
        &format!("/api/posts/{post_id}/comments"),
        Some(json!({ "username": "bob", "content": "Nice" })),
    )
    .await;
    assert_eq!(commented.status, StatusCode::OK);
    assert_eq!(commented.body["post"]["comments"][0]["authorUsername"], "bob");
}

#[tokio::test]
async fn test_bad_input_gets_the_error_envelope() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);

    let bad_id = send(
        &app,
        Method::DELETE,
        "/api/posts/not-a-uuid",
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(bad_id.status, StatusCode::NOT_FOUND);
    assert_eq!(bad_id.body["message"], "Post not found");

    let unknown = send(&app, Method::GET, "/api/users/ghost", None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "User not found");
}

#[tokio::test]
async fn test_static_file_guard() {
    let app = app();

    let page = send(&app, Method::GET, "/index.html", None).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.text.contains("Conview test page"));

    for path in ["/.env", "/.git/config", "/notes.txt", "/Cargo.toml"] {
        let refused = send(&app, Method::GET, path, None).await;
        assert_eq!(refused.status, StatusCode::FORBIDDEN, "{path}");
        assert_eq!(refused.body["message"], "Access denied");
    }
}

#[tokio::test]
async fn test_unknown_api_route_gets_the_error_envelope() {
    let app = app();

    for path in ["/api/nothing-here", "/api/users/alice/followers"] {
        let missing = send(&app, Method::GET, path, None).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(missing.body["success"], false);
        assert_eq!(missing.body["message"], "Route not found");
    }

    let missing_file = send(&app, Method::GET, "/missing.html", None).await;
    assert_eq!(missing_file.status, StatusCode::NOT_FOUND);
    assert_eq!(missing_file.body, Value::Null);
}

#[tokio::test]
async fn test_health_reports_store_state() {
    let app = app();

    let health = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["success"], true);
    assert_eq!(health.body["message"], "Server is running");
    assert_eq!(health.body["database"], "connected");
}
