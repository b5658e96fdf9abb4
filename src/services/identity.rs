// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity session: who is signed in, and for how long.
//!
//! The session survives a restart only when the user asked to be remembered
//! at sign-in. An optional absolute timeout signs the user out a fixed time
//! after sign-in regardless of activity.

use crate::models::Principal;
use crate::store::{keys, CredentialStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Sign-in errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// Message reported by the identity provider, passed through verbatim.
    #[error("{0}")]
    Provider(String),

    #[error("Invalid ID token: {0}")]
    InvalidToken(String),

    #[error("Invalid or tampered sign-in state")]
    InvalidState,

    #[error("Identity provider unavailable: {0}")]
    Transient(String),
}

/// Interactive third-party sign-in.
pub trait IdentityProvider: Send + Sync {
    /// Where to send the user to start signing in.
    fn authorization_url(&self, state: &str) -> String;

    /// Complete sign-in with the code the provider handed back.
    fn authenticate(&self, code: &str) -> impl Future<Output = Result<Principal, AuthError>> + Send;
}

/// Session as persisted in local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    principal: Principal,
    signed_in_at: DateTime<Utc>,
}

#[derive(Default)]
struct SessionInner {
    current: Option<StoredSession>,
    last_error: Option<String>,
    /// Bumped on every sign-in/sign-out so a stale timer never ends a newer session.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct SessionProvider {
    store: CredentialStore,
    timeout: Option<Duration>,
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionProvider {
    pub fn new(store: CredentialStore, timeout: Option<Duration>) -> Self {
        Self {
            store,
            timeout,
            inner: Arc::new(Mutex::new(SessionInner::default())),
        }
    }

    /// Restore a persisted session, if policy allows.
    ///
    /// Without a stored remember-me flag any persisted session is signed
    /// out. A session whose absolute window has already elapsed is signed
    /// out as well.
    pub async fn initialize(&self) {
        let Some(session) = self.store.load_json::<StoredSession>(keys::IDENTITY_SESSION) else {
            return;
        };

        if !self.store.remember_me() {
            tracing::info!(
                subject = %session.principal.id,
                "Persisted session without remember-me, signing out"
            );
            self.sign_out().await;
            return;
        }

        let remaining = match self.remaining(&session) {
            Some(remaining) if remaining.is_zero() => {
                tracing::info!(subject = %session.principal.id, "Persisted session expired");
                self.sign_out().await;
                return;
            }
            other => other,
        };

        tracing::info!(subject = %session.principal.id, "Restored remembered session");

        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.current = Some(session);
        if let Some(remaining) = remaining {
            let generation = inner.generation;
            inner.timer = Some(self.spawn_expiry(generation, remaining));
        }
    }

    /// Complete sign-in with `provider`.
    ///
    /// The remember-me preference is stored before the provider is asked,
    /// so the next startup sees the policy chosen for this sign-in. On
    /// failure the provider's message is kept as `last_error` and the error
    /// is handed back to the caller.
    pub async fn sign_in<P: IdentityProvider>(
        &self,
        provider: &P,
        code: &str,
        remember_me: bool,
    ) -> Result<Principal, AuthError> {
        if let Err(e) = self.store.set_remember_me(remember_me) {
            tracing::warn!(error = %e, "Failed to persist remember-me preference");
        }

        {
            self.inner.lock().await.last_error = None;
        }

        let principal = match provider.authenticate(code).await {
            Ok(principal) => principal,
            Err(e) => {
                self.record_failure(&e).await;
                return Err(e);
            }
        };

        let session = StoredSession {
            principal: principal.clone(),
            signed_in_at: Utc::now(),
        };

        let mut inner = self.inner.lock().await;
        if let Err(e) = self.store.save_json(keys::IDENTITY_SESSION, &session) {
            tracing::warn!(error = %e, "Failed to persist identity session");
        }
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.generation += 1;
        inner.current = Some(session);
        if let Some(timeout) = self.timeout {
            let generation = inner.generation;
            inner.timer = Some(self.spawn_expiry(generation, timeout));
        }

        tracing::info!(
            subject = %principal.id,
            remember_me,
            "User signed in"
        );

        Ok(principal)
    }

    /// Keep `err` as the message of the most recent failed sign-in.
    ///
    /// Used for failures reported before the provider is ever asked, such
    /// as the user cancelling consent or a tampered sign-in state.
    pub async fn record_failure(&self, err: &AuthError) {
        tracing::warn!(error = %err, "Sign-in failed");
        self.inner.lock().await.last_error = Some(err.to_string());
    }

    /// Sign out and forget the remember-me preference. Idempotent.
    pub async fn sign_out(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.generation += 1;
        let was_signed_in = inner.current.take().is_some();
        forget_persisted(&self.store);
        drop(inner);

        if was_signed_in {
            tracing::info!("User signed out");
        }
    }

    /// The signed-in principal, if any and not past the absolute timeout.
    pub async fn current_principal(&self) -> Option<Principal> {
        let mut inner = self.inner.lock().await;
        let session = inner.current.as_ref()?;

        if self.remaining(session).is_some_and(|r| r.is_zero()) {
            tracing::info!(subject = %session.principal.id, "Session timed out");
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.generation += 1;
            inner.current = None;
            forget_persisted(&self.store);
            return None;
        }

        Some(session.principal.clone())
    }

    /// Message of the most recent failed sign-in.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    pub fn remember_me(&self) -> bool {
        self.store.remember_me()
    }

    /// Time left in the absolute window, `None` when no timeout is configured.
    fn remaining(&self, session: &StoredSession) -> Option<Duration> {
        let timeout = self.timeout?;
        let elapsed = (Utc::now() - session.signed_in_at)
            .to_std()
            .unwrap_or_default();
        Some(timeout.saturating_sub(elapsed))
    }

    fn spawn_expiry(&self, generation: u64, after: Duration) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let store = self.store.clone();

        tokio::spawn(async move {
            tokio::time::sleep(after).await;

            let mut guard = inner.lock().await;
            if guard.generation != generation || guard.current.is_none() {
                return;
            }
            guard.current = None;
            guard.generation += 1;
            guard.timer = None;
            forget_persisted(&store);
            drop(guard);

            tracing::info!("Session expired, user signed out");
        })
    }
}

/// Remove the persisted session and remember-me flag.
///
/// Callers hold the session lock so a concurrent sign-in cannot have its
/// freshly saved session removed.
fn forget_persisted(store: &CredentialStore) {
    if let Err(e) = store.remove(keys::IDENTITY_SESSION) {
        tracing::warn!(error = %e, "Failed to remove persisted session");
    }
    if let Err(e) = store.clear_remember_me() {
        tracing::warn!(error = %e, "Failed to clear remember-me preference");
    }
}
