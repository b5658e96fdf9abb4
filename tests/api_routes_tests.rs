// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route tests.
//!
//! These tests verify that:
//! 1. Key and workflow routes reject requests without a signed-in user
//! 2. The key routes drive the orchestrator once signed in
//! 3. The Google sign-in round trip starts and ends a session

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use botnoi_key_portal::config::Config;
use botnoi_key_portal::routes::create_router;
use botnoi_key_portal::services::GoogleIdentity;
use botnoi_key_portal::store::{keys, KeyValueStore, MemoryStore};
use botnoi_key_portal::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{create_test_app, sign_in, test_config, API_KEY_PATH, LOGIN_PATH};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _, _) = create_test_app(Config::test_default()).await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_without_sign_in() {
    let (app, _, _) = create_test_app(Config::test_default()).await;

    for request in [
        get("/api/key"),
        get("/workflow"),
        post_json("/api/key/refresh", json!({})),
        post_json(
            "/api/key/login",
            json!({"email": "a@b.com", "password": "x"}),
        ),
    ] {
        let uri = request.uri().to_string();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{uri} should require sign-in"
        );
        assert_eq!(json_body(response).await["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_key_state_when_empty() {
    let (app, state, _) = create_test_app(Config::test_default()).await;
    sign_in(&state).await;

    let response = app.oneshot(get("/api/key")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["hasApiKey"], false);
    assert_eq!(body["hasStoredCredentials"], false);
    assert_eq!(body["apiData"], Value::Null);
}

#[tokio::test]
async fn test_refresh_without_credentials_is_conflict() {
    let (app, state, _) = create_test_app(Config::test_default()).await;
    sign_in(&state).await;

    let response = app
        .oneshot(post_json("/api/key/refresh", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"], "no_stored_credentials");
}

#[tokio::test]
async fn test_login_with_blank_password_is_bad_request() {
    let (app, state, _) = create_test_app(Config::test_default()).await;
    sign_in(&state).await;

    let response = app
        .oneshot(post_json(
            "/api/key/login",
            json!({"email": "a@b.com", "password": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_fetch_and_clear() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "T1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(API_KEY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"apiKey": "K1", "quota": 100, "usage": 5})),
        )
        .mount(&server)
        .await;

    let (app, state, store) = create_test_app(test_config(&server.uri())).await;
    sign_in(&state).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/key/login",
            json!({"email": " a@b.com", "password": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["hasApiKey"], true);
    assert_eq!(body["hasStoredCredentials"], true);
    assert_eq!(body["apiData"]["apiKey"], "K1");
    assert!(store.contains(keys::API_DATA));

    // Credentials are sent and stored exactly as entered
    let requests = server.received_requests().await.unwrap();
    let login_body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(login_body["email"], " a@b.com");
    let stored: Value =
        serde_json::from_str(&store.get(keys::CREDENTIALS).unwrap().unwrap()).unwrap();
    assert_eq!(stored["email"], " a@b.com");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["hasApiKey"], false);
    assert_eq!(body["hasStoredCredentials"], false);
    assert!(!store.contains(keys::API_DATA));
    assert!(!store.contains(keys::CREDENTIALS));
}

#[tokio::test]
async fn test_botnoi_failure_is_bad_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (app, state, _) = create_test_app(test_config(&server.uri())).await;
    sign_in(&state).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/key/login",
            json!({"email": "a@b.com", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = json_body(response).await;
    assert_eq!(body["error"], "botnoi_error");
    assert_eq!(body["details"], "Login failed with status 401");

    // The error is kept in the key state until the next success
    let body = json_body(app.oneshot(get("/api/key")).await.unwrap()).await;
    assert_eq!(body["error"], "Login failed with status 401");
}

#[tokio::test]
async fn test_workflow_redirect_when_signed_in() {
    let (app, state, _) = create_test_app(Config::test_default()).await;
    sign_in(&state).await;

    let response = app.oneshot(get("/workflow")).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), state.config.workflow_url);
}

#[tokio::test]
async fn test_session_view_and_logout() {
    let (app, state, _) = create_test_app(Config::test_default()).await;

    let body = json_body(app.clone().oneshot(get("/auth/me")).await.unwrap()).await;
    assert_eq!(body["signedIn"], false);
    assert_eq!(body["user"], Value::Null);

    sign_in(&state).await;

    let body = json_body(app.clone().oneshot(get("/auth/me")).await.unwrap()).await;
    assert_eq!(body["signedIn"], true);
    assert_eq!(body["user"]["email"], "user@example.com");
    assert_eq!(body["user"]["displayName"], "Test User");
    assert!(body["user"].get("idToken").is_none());

    let response = app
        .clone()
        .oneshot(post_json("/auth/logout", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Logging out twice is harmless
    let response = app
        .clone()
        .oneshot(post_json("/auth/logout", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/api/key")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_start_redirects_to_google() {
    let (app, _, _) = create_test_app(Config::test_default()).await;

    let response = app
        .oneshot(get("/auth/google?remember_me=true"))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let url = location(&response);
    assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    assert!(url.contains("state="));
}

#[tokio::test]
async fn test_callback_with_bad_state_redirects_with_error() {
    let (app, state, _) = create_test_app(Config::test_default()).await;

    let response = app
        .clone()
        .oneshot(get("/auth/google/callback?code=abc&state=forged"))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let url = location(&response);
    assert!(url.starts_with(&format!("{}?error=", state.config.frontend_url)));
    assert!(state.sessions.current_principal().await.is_none());

    let body = json_body(app.oneshot(get("/auth/me")).await.unwrap()).await;
    assert_eq!(body["signedIn"], false);
    assert_eq!(body["error"], "Invalid or tampered sign-in state");
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let (app, state, _) = create_test_app(Config::test_default()).await;

    let response = app
        .clone()
        .oneshot(get("/auth/google/callback?error=access_denied"))
        .await
        .unwrap();

    assert_eq!(
        location(&response),
        format!("{}?error=access_denied", state.config.frontend_url)
    );

    // The cancelled sign-in is kept for the session view
    assert_eq!(
        state.sessions.last_error().await.as_deref(),
        Some("access_denied")
    );
    let body = json_body(app.oneshot(get("/auth/me")).await.unwrap()).await;
    assert_eq!(body["error"], "access_denied");
}

const SIGNING_SECRET: &[u8] = b"route-test-signing-secret";

fn id_token(aud: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = json!({
        "iss": "accounts.google.com",
        "aud": aud,
        "sub": "google-sub-7",
        "exp": now + 3600,
        "iat": now,
        "email": "remembered@example.com",
        "email_verified": true,
    });

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("route-kid".to_string());
    encode(&header, &claims, &EncodingKey::from_secret(SIGNING_SECRET)).unwrap()
}

/// Drive the full start/callback round trip against a mock token endpoint.
async fn google_round_trip(config: Config, remember_me: bool) -> (Response, Arc<AppState>) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id_token": id_token(&config.google_client_id)})),
        )
        .mount(&server)
        .await;

    let identity = GoogleIdentity::new_with_static_key(
        &config,
        "route-kid",
        DecodingKey::from_secret(SIGNING_SECRET),
        Algorithm::HS256,
    )
    .unwrap()
    .with_token_url(format!("{}/token", server.uri()));

    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::build(config, store.clone(), identity).await);
    let app = create_router(state.clone());

    let start = app
        .clone()
        .oneshot(get(&format!("/auth/google?remember_me={remember_me}")))
        .await
        .unwrap();
    let url = location(&start);
    let oauth_state = url
        .split("state=")
        .nth(1)
        .and_then(|rest| rest.split('&').next())
        .unwrap()
        .to_string();

    let callback = app
        .oneshot(get(&format!(
            "/auth/google/callback?code=good-code&state={oauth_state}"
        )))
        .await
        .unwrap();

    assert_eq!(
        store.get(keys::REMEMBER_ME).unwrap().as_deref(),
        Some(if remember_me { "true" } else { "false" })
    );

    (callback, state)
}

#[tokio::test]
async fn test_google_round_trip_signs_in() {
    let config = Config::test_default();
    let frontend_url = config.frontend_url.clone();

    let (response, state) = google_round_trip(config, true).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), frontend_url);

    let principal = state.sessions.current_principal().await.unwrap();
    assert_eq!(principal.id, "google-sub-7");
    assert_eq!(principal.email.as_deref(), Some("remembered@example.com"));
    assert!(state.sessions.remember_me());
}

#[tokio::test]
async fn test_google_round_trip_auto_redirects_to_workflow() {
    let mut config = Config::test_default();
    config.auto_redirect_to_workflow = true;
    let workflow_url = config.workflow_url.clone();

    let (response, state) = google_round_trip(config, false).await;

    assert_eq!(location(&response), workflow_url);
    assert!(state.sessions.current_principal().await.is_some());
    assert!(!state.sessions.remember_me());
}
