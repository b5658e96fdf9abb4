// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Botnoi Key Portal: sign in with Google, then fetch and cache a Botnoi
//! Voice developer API key or continue to the workflow workspace.
//!
//! This crate provides a local single-user service; everything it remembers
//! lives in a local key/value store.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use config::Config;
use services::{ApiKeyOrchestrator, BotnoiClient, GoogleIdentity, SessionProvider};
use std::sync::Arc;
use store::{CredentialStore, KeyValueStore};
use tokio::sync::Mutex;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: GoogleIdentity,
    pub sessions: SessionProvider,
    pub api_keys: Mutex<ApiKeyOrchestrator>,
}

impl AppState {
    /// Wire services over `store` and restore any remembered session.
    pub async fn build(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        identity: GoogleIdentity,
    ) -> Self {
        let credentials = CredentialStore::new(store);

        let sessions = SessionProvider::new(credentials.clone(), config.session_timeout);
        sessions.initialize().await;

        let api_keys = ApiKeyOrchestrator::new(BotnoiClient::from_config(&config), credentials);

        Self {
            config,
            identity,
            sessions,
            api_keys: Mutex::new(api_keys),
        }
    }
}
