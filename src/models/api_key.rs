//! API key and Botnoi login models for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cached Botnoi API key with quota information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    /// The developer API key
    pub api_key: String,
    /// Total quota granted by the platform
    #[serde(default)]
    pub quota: f64,
    /// Quota already consumed
    #[serde(default)]
    pub usage: f64,
}

impl ApiKeyRecord {
    /// A record only counts as a usable key when the key string is non-empty.
    pub fn is_usable(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Botnoi Voice login credentials, replayed on refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields must be present before we bother the login endpoint.
    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result envelope of a complete key pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ApiKeyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResponse {
    pub fn ok(data: ApiKeyRecord) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
