// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key routes for the signed-in user.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::LoginCredentials;
use crate::services::KeyState;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// API routes (require a signed-in principal).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/key", get(get_key_state).delete(clear_key))
        .route("/api/key/login", post(login_and_fetch))
        .route("/api/key/refresh", post(refresh_key))
        .route("/api/key/validate", post(validate_key))
}

/// Botnoi login form body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Current API key state.
async fn get_key_state(State(state): State<Arc<AppState>>) -> Json<KeyState> {
    Json(state.api_keys.lock().await.state())
}

/// Log in to Botnoi with the given credentials and fetch the API key.
async fn login_and_fetch(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<KeyState>> {
    tracing::info!(subject = %user.principal.id, "Fetching Botnoi API key with login");

    let mut api_keys = state.api_keys.lock().await;
    api_keys
        .fetch_with_login(LoginCredentials::new(body.email, body.password))
        .await?;

    Ok(Json(api_keys.state()))
}

/// Fetch the API key again with the stored credentials.
async fn refresh_key(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<KeyState>> {
    tracing::info!(subject = %user.principal.id, "Refreshing Botnoi API key");

    let mut api_keys = state.api_keys.lock().await;
    api_keys.refresh().await?;

    Ok(Json(api_keys.state()))
}

/// Forget the cached key and credentials.
async fn clear_key(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<KeyState> {
    tracing::info!(subject = %user.principal.id, "Clearing Botnoi API key");

    let mut api_keys = state.api_keys.lock().await;
    api_keys.clear();

    Json(api_keys.state())
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

/// Check the cached key with Botnoi.
async fn validate_key(State(state): State<Arc<AppState>>) -> Json<ValidateResponse> {
    let valid = state.api_keys.lock().await.validate().await;
    Json(ValidateResponse { valid })
}
