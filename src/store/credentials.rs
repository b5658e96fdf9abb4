// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the entries the portal keeps in local storage.
//!
//! Values are JSON-serialized. A value that no longer parses as the expected
//! structure is treated as absent and removed, so a corrupt cache entry never
//! outlives the read that found it.

use super::{keys, KeyValueStore, StoreError};
use crate::models::{ApiKeyRecord, LoginCredentials};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    // ─── API key cache ───────────────────────────────────────────

    pub fn load_api_data(&self) -> Option<ApiKeyRecord> {
        self.load_json(keys::API_DATA)
    }

    pub fn save_api_data(&self, record: &ApiKeyRecord) -> Result<(), StoreError> {
        self.save_json(keys::API_DATA, record)
    }

    pub fn remove_api_data(&self) -> Result<(), StoreError> {
        self.inner.delete(keys::API_DATA)
    }

    // ─── Login credentials ───────────────────────────────────────

    pub fn load_credentials(&self) -> Option<LoginCredentials> {
        self.load_json(keys::CREDENTIALS)
    }

    pub fn save_credentials(&self, credentials: &LoginCredentials) -> Result<(), StoreError> {
        self.save_json(keys::CREDENTIALS, credentials)
    }

    pub fn remove_credentials(&self) -> Result<(), StoreError> {
        self.inner.delete(keys::CREDENTIALS)
    }

    // ─── Remember-me flag ────────────────────────────────────────

    /// Only an explicit stored `true` counts as remembered.
    pub fn remember_me(&self) -> bool {
        self.load_json::<bool>(keys::REMEMBER_ME).unwrap_or(false)
    }

    pub fn set_remember_me(&self, remember: bool) -> Result<(), StoreError> {
        self.save_json(keys::REMEMBER_ME, &remember)
    }

    pub fn clear_remember_me(&self) -> Result<(), StoreError> {
        self.inner.delete(keys::REMEMBER_ME)
    }

    // ─── Generic JSON helpers ────────────────────────────────────

    /// Read and parse `key`, deleting the entry if it does not parse.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.inner.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read storage entry");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(source) => {
                let err = StoreError::Malformed {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(error = %err, "Discarding malformed storage entry");
                if let Err(e) = self.inner.delete(key) {
                    tracing::warn!(key, error = %e, "Failed to delete malformed storage entry");
                }
                None
            }
        }
    }

    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.inner.set(key, &raw)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key)
    }
}
