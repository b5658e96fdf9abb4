// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key orchestration: owns the cached key and credentials.
//!
//! State is hydrated from the credential store at construction and written
//! back after every successful fetch. A failed fetch records an error message
//! and leaves the previous key and credentials untouched.

use crate::models::{ApiKeyRecord, LoginCredentials};
use crate::services::botnoi::{BotnoiClient, ClientError};
use crate::store::CredentialStore;
use serde::Serialize;

/// Orchestrator errors.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("No stored credentials")]
    NoStoredCredentials,

    #[error("Email and password are required")]
    IncompleteCredentials,

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Snapshot of orchestrator state for API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyState {
    pub has_api_key: bool,
    pub has_stored_credentials: bool,
    pub api_data: Option<ApiKeyRecord>,
    pub error: Option<String>,
}

pub struct ApiKeyOrchestrator {
    client: BotnoiClient,
    store: CredentialStore,
    api_data: Option<ApiKeyRecord>,
    credentials: Option<LoginCredentials>,
    error: Option<String>,
}

impl ApiKeyOrchestrator {
    /// Create the orchestrator, hydrating from storage.
    pub fn new(client: BotnoiClient, store: CredentialStore) -> Self {
        let api_data = store.load_api_data();
        let credentials = store.load_credentials();

        tracing::debug!(
            has_api_key = api_data.as_ref().is_some_and(ApiKeyRecord::is_usable),
            has_stored_credentials = credentials.is_some(),
            "API key state hydrated from storage"
        );

        Self {
            client,
            store,
            api_data,
            credentials,
            error: None,
        }
    }

    /// Run the key pipeline with `credentials` and cache the result.
    pub async fn fetch_with_login(
        &mut self,
        credentials: LoginCredentials,
    ) -> Result<&ApiKeyRecord, OrchestratorError> {
        if !credentials.is_complete() {
            return Err(self.record_error(OrchestratorError::IncompleteCredentials));
        }

        let record = match self.client.run_pipeline(&credentials).await {
            Ok(record) => record,
            Err(e) => return Err(self.record_error(e.into())),
        };

        // A save failure keeps the fetched key in memory and is reported via `error`
        let persisted = self
            .store
            .save_api_data(&record)
            .and_then(|()| self.store.save_credentials(&credentials));

        tracing::info!(
            email = %credentials.email,
            quota = record.quota,
            usage = record.usage,
            "Botnoi API key fetched"
        );

        self.error = match persisted {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist API key state");
                Some(format!("Failed to save to local storage: {e}"))
            }
        };
        self.credentials = Some(credentials);
        Ok(self.api_data.insert(record))
    }

    /// Re-run the pipeline with the stored credentials.
    pub async fn refresh(&mut self) -> Result<&ApiKeyRecord, OrchestratorError> {
        let Some(credentials) = self.credentials.clone() else {
            return Err(self.record_error(OrchestratorError::NoStoredCredentials));
        };

        self.fetch_with_login(credentials).await
    }

    /// Forget the key, the credentials and any error.
    pub fn clear(&mut self) {
        self.api_data = None;
        self.credentials = None;
        self.error = None;

        if let Err(e) = self.store.remove_api_data() {
            tracing::warn!(error = %e, "Failed to remove stored API key");
        }
        if let Err(e) = self.store.remove_credentials() {
            tracing::warn!(error = %e, "Failed to remove stored credentials");
        }

        tracing::info!("API key state cleared");
    }

    /// Check the cached key against Botnoi. `false` when there is none.
    pub async fn validate(&self) -> bool {
        match self.api_data.as_ref().filter(|r| r.is_usable()) {
            Some(record) => self.client.validate_api_key(&record.api_key).await,
            None => false,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_data.as_ref().is_some_and(ApiKeyRecord::is_usable)
    }

    pub fn has_stored_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn api_data(&self) -> Option<&ApiKeyRecord> {
        self.api_data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn state(&self) -> KeyState {
        KeyState {
            has_api_key: self.has_api_key(),
            has_stored_credentials: self.has_stored_credentials(),
            api_data: self.api_data.clone(),
            error: self.error.clone(),
        }
    }

    fn record_error(&mut self, err: OrchestratorError) -> OrchestratorError {
        tracing::warn!(error = %err, "API key fetch failed");
        self.error = Some(err.to_string());
        err
    }
}
