// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use botnoi_key_portal::config::Config;
use botnoi_key_portal::models::Principal;
use botnoi_key_portal::routes::create_router;
use botnoi_key_portal::services::{AuthError, GoogleIdentity, IdentityProvider};
use botnoi_key_portal::store::MemoryStore;
use botnoi_key_portal::AppState;
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Login path served by the mock Botnoi server.
#[allow(dead_code)]
pub const LOGIN_PATH: &str = "/api/login";

/// API key path served by the mock Botnoi server.
#[allow(dead_code)]
pub const API_KEY_PATH: &str = "/tts/api-developer-v2";

/// Test config pointing the Botnoi client at `botnoi_uri`.
#[allow(dead_code)]
pub fn test_config(botnoi_uri: &str) -> Config {
    let mut config = Config::test_default();
    config.botnoi_login_url = format!("{}{}", botnoi_uri, LOGIN_PATH);
    config.botnoi_api_key_url = format!("{}{}", botnoi_uri, API_KEY_PATH);
    config
}

/// Identity provider that always succeeds (or always fails) without a network.
#[allow(dead_code)]
pub struct FakeIdentity {
    pub result: Result<Principal, AuthError>,
}

impl IdentityProvider for FakeIdentity {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://idp.test/authorize?state={state}")
    }

    async fn authenticate(&self, _code: &str) -> Result<Principal, AuthError> {
        self.result.clone()
    }
}

#[allow(dead_code)]
pub fn test_principal() -> Principal {
    Principal::new(
        "google-sub-1",
        Some("Test User".to_string()),
        Some("user@example.com".to_string()),
        Some("https://example.com/photo.png".to_string()),
        "test-id-token",
        Utc::now() + Duration::hours(1),
    )
}

/// Create a test app with an in-memory store.
/// Returns the router, the shared state and the store.
#[allow(dead_code)]
pub async fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let identity = GoogleIdentity::new(&config).expect("identity provider");
    let state = Arc::new(AppState::build(config, store.clone(), identity).await);

    (create_router(state.clone()), state, store)
}

/// Sign the test principal in directly, skipping the Google round trip.
#[allow(dead_code)]
pub async fn sign_in(state: &AppState) {
    let provider = FakeIdentity {
        result: Ok(test_principal()),
    };
    state
        .sessions
        .sign_in(&provider, "test-code", false)
        .await
        .expect("fake sign-in");
}
