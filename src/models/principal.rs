//! Authenticated identity returned by the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Signed-in Google user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable provider subject ID
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    /// Raw ID token issued at sign-in
    id_token: String,
    id_token_expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(
        id: impl Into<String>,
        display_name: Option<String>,
        email: Option<String>,
        photo_url: Option<String>,
        id_token: impl Into<String>,
        id_token_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name,
            email,
            photo_url,
            id_token: id_token.into(),
            id_token_expires_at,
        }
    }

    /// Short-lived bearer token for this principal, if it has not expired.
    pub fn bearer_token(&self) -> Option<&str> {
        (Utc::now() < self.id_token_expires_at).then_some(self.id_token.as_str())
    }
}
