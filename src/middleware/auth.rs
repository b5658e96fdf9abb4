// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed-in principal middleware.

use crate::error::AppError;
use crate::models::Principal;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from the identity session.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

/// Middleware that requires a signed-in, unexpired identity session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state
        .sessions
        .current_principal()
        .await
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser { principal });

    Ok(next.run(request).await)
}
