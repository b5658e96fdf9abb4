// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in routes and the workflow redirect.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::Principal;
use crate::services::identity::{AuthError, IdentityProvider};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a sign-in round trip may take before its state is refused.
const STATE_MAX_AGE_MILLIS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", get(auth_start))
        .route("/auth/google/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_session))
}

/// Routes that need a signed-in principal; the auth middleware is applied
/// in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/workflow", get(workflow_redirect))
}

/// Query parameters for starting sign-in.
#[derive(Deserialize)]
pub struct AuthStartParams {
    #[serde(default)]
    remember_me: bool,
}

/// Start sign-in - redirect to Google.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthStartParams>,
) -> Result<Redirect> {
    let oauth_state = sign_state(params.remember_me, now_millis()?, &state.config.oauth_state_key)?;
    let auth_url = state.identity.authorization_url(&oauth_state);

    tracing::info!(
        remember_me = params.remember_me,
        "Starting Google sign-in"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Sign-in callback - exchange the code, start the session, redirect.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = state.config.frontend_url.clone();
    let fail = |message: &str| {
        Redirect::temporary(&format!(
            "{}?error={}",
            frontend_url,
            urlencoding::encode(message)
        ))
    };

    // Check for errors reported by Google (e.g. the user closed the consent screen)
    if let Some(error) = params.error {
        let err = AuthError::Provider(error);
        state.sessions.record_failure(&err).await;
        return fail(&err.to_string());
    }

    let Some(remember_me) = params.state.as_deref().and_then(|s| {
        verify_state(s, now_millis().ok()?, &state.config.oauth_state_key)
    }) else {
        let err = AuthError::InvalidState;
        state.sessions.record_failure(&err).await;
        return fail(&err.to_string());
    };

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        let err = AuthError::Provider("missing authorization code".to_string());
        state.sessions.record_failure(&err).await;
        return fail(&err.to_string());
    };

    match state
        .sessions
        .sign_in(&state.identity, &code, remember_me)
        .await
    {
        Ok(principal) => {
            tracing::info!(subject = %principal.id, "Sign-in complete");
            if state.config.auto_redirect_to_workflow {
                Redirect::temporary(&state.config.workflow_url)
            } else {
                Redirect::temporary(&frontend_url)
            }
        }
        Err(e) => fail(&e.to_string()),
    }
}

/// Public view of the signed-in principal.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalView {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl From<Principal> for PrincipalView {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name,
            email: p.email,
            photo_url: p.photo_url,
        }
    }
}

/// Current identity session state.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub signed_in: bool,
    pub user: Option<PrincipalView>,
    pub remember_me: bool,
    pub error: Option<String>,
}

async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let principal = state.sessions.current_principal().await;

    Json(SessionResponse {
        signed_in: principal.is_some(),
        user: principal.map(PrincipalView::from),
        remember_me: state.sessions.remember_me(),
        error: state.sessions.last_error().await,
    })
}

/// Sign out locally. Safe to call when already signed out.
async fn logout(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    state.sessions.sign_out().await;

    Json(SessionResponse {
        signed_in: false,
        user: None,
        remember_me: false,
        error: None,
    })
}

/// Send the signed-in user to the workflow workspace.
async fn workflow_redirect(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::to(&state.config.workflow_url)
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Encode the remember-me choice and a timestamp into a signed OAuth state.
fn sign_state(remember_me: bool, timestamp_millis: u128, secret: &[u8]) -> Result<String> {
    // Create the data payload: "remember|timestamp_hex"
    let payload = format!("{}|{:x}", u8::from(remember_me), timestamp_millis);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the HMAC signature and age of an OAuth state; returns the
/// remember-me choice it carries.
fn verify_state(state: &str, now_millis: u128, secret: &[u8]) -> Option<bool> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Format is "remember|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [remember, timestamp_hex, signature_hex] = parts.as_slice() else {
        return None;
    };

    let payload = format!("{}|{}", remember, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected = mac.finalize().into_bytes();

    let provided = hex::decode(signature_hex).ok()?;
    if !bool::from(expected.as_slice().ct_eq(&provided)) {
        tracing::error!("Sign-in state signature mismatch! Potential tampering.");
        return None;
    }

    let issued = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_millis.saturating_sub(issued) > STATE_MAX_AGE_MILLIS {
        tracing::warn!("Sign-in state expired");
        return None;
    }

    match *remember {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}
