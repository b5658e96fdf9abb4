// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Botnoi Voice API client for obtaining a developer API key.
//!
//! Handles:
//! - Login with email/password to obtain a session token
//! - API key lookup as JSON
//! - HTML page scraping when the JSON lookup fails
//!
//! No step is retried; the first failure ends the pipeline.

use crate::config::Config;
use crate::models::{ApiKeyRecord, LoginCredentials, PipelineResponse};
use regex::Regex;
use reqwest::header::{ACCEPT, COOKIE};
use serde_json::Value;
use std::sync::LazyLock;

/// Accepted field names for the session token, in lookup order.
pub const TOKEN_FIELDS: &[&str] = &["token", "access_token"];

/// Accepted field names for the API key, in lookup order.
pub const API_KEY_FIELDS: &[&str] = &["apiKey", "api_key", "key"];

const QUOTA_FIELD: &str = "quota";
const USAGE_FIELD: &str = "usage";

/// `key["\s]*[:=]["\s]*value` matchers for each API key alias.
static API_KEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    API_KEY_FIELDS
        .iter()
        .filter_map(|field| {
            Regex::new(&format!(
                r#"(?i){}["\s]*[:=]["\s]*([^"'\s<>,;{{}}]+)"#,
                regex::escape(field)
            ))
            .ok()
        })
        .collect()
});

static QUOTA_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| numeric_pattern(QUOTA_FIELD));

static USAGE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| numeric_pattern(USAGE_FIELD));

fn numeric_pattern(field: &str) -> Option<Regex> {
    Regex::new(&format!(
        r#"(?i){}["\s]*[:=]["\s]*(\d+(?:\.\d+)?)"#,
        regex::escape(field)
    ))
    .ok()
}

/// Botnoi client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Login failed with status {status}")]
    Login { status: u16 },

    #[error("Login request failed: {0}")]
    LoginUnreachable(String),

    #[error("Login response did not include a session token")]
    MissingToken,

    #[error("API key request failed: {0}")]
    Fetch(String),

    #[error("No API key found in page")]
    Extraction,
}

/// Outcome of a successful login call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    /// Session token, if the response carried one under a known field.
    pub token: Option<String>,
}

/// A way of turning a session token into an API key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Structured JSON lookup
    Json,
    /// Pattern matching over the HTML page
    HtmlScrape,
}

impl KeyStrategy {
    /// Strategies in the order the pipeline tries them.
    pub const ORDER: [KeyStrategy; 2] = [KeyStrategy::Json, KeyStrategy::HtmlScrape];

    pub fn name(self) -> &'static str {
        match self {
            KeyStrategy::Json => "json",
            KeyStrategy::HtmlScrape => "html_scrape",
        }
    }
}

/// Botnoi Voice API client.
#[derive(Clone)]
pub struct BotnoiClient {
    http: reqwest::Client,
    login_url: String,
    api_key_url: String,
}

impl BotnoiClient {
    pub fn new(login_url: impl Into<String>, api_key_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            login_url: login_url.into(),
            api_key_url: api_key_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.botnoi_login_url, &config.botnoi_api_key_url)
    }

    /// Log in with Botnoi credentials.
    ///
    /// A 2xx response without a token field is still `Ok` with `token: None`;
    /// the caller decides what that means.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, ClientError> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });

        let response = self
            .http
            .post(&self.login_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::LoginUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "Botnoi login rejected");
            return Err(ClientError::Login {
                status: status.as_u16(),
            });
        }

        let token = match response.json::<Value>().await {
            Ok(json) => resolve_alias(&json, TOKEN_FIELDS).map(str::to_string),
            Err(e) => {
                tracing::warn!(error = %e, "Botnoi login response was not JSON");
                None
            }
        };

        Ok(LoginResponse { token })
    }

    /// Fetch the API key as JSON using a session token.
    pub async fn fetch_key_with_token(&self, token: &str) -> Result<ApiKeyRecord, ClientError> {
        let response = self
            .http
            .get(&self.api_key_url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ClientError::Fetch(e.to_string()))?;

        let response = check_status(response).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Fetch(format!("JSON parse error: {}", e)))?;

        record_from_json(&json)
            .ok_or_else(|| ClientError::Fetch("response did not include an API key".to_string()))
    }

    /// Fetch the API key page as HTML and pattern-match the key out of it.
    ///
    /// Sends the token both as a bearer header and as the raw cookie value.
    pub async fn scrape_key_from_page(&self, token: &str) -> Result<ApiKeyRecord, ClientError> {
        let response = self
            .http
            .get(&self.api_key_url)
            .bearer_auth(token)
            .header(COOKIE, token)
            .header(ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| ClientError::Fetch(e.to_string()))?;

        let response = check_status(response).await?;

        let html = response
            .text()
            .await
            .map_err(|e| ClientError::Fetch(format!("Failed to read page: {}", e)))?;

        extract_from_html(&html).ok_or(ClientError::Extraction)
    }

    /// Run a single key strategy.
    pub async fn fetch_with_strategy(
        &self,
        strategy: KeyStrategy,
        token: &str,
    ) -> Result<ApiKeyRecord, ClientError> {
        match strategy {
            KeyStrategy::Json => self.fetch_key_with_token(token).await,
            KeyStrategy::HtmlScrape => self.scrape_key_from_page(token).await,
        }
    }

    /// Full pipeline: login, then each key strategy in order with the same token.
    pub async fn run_pipeline(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<ApiKeyRecord, ClientError> {
        let token = self
            .login(credentials)
            .await?
            .token
            .ok_or(ClientError::MissingToken)?;

        let mut last_err = ClientError::Extraction;
        for strategy in KeyStrategy::ORDER {
            match self.fetch_with_strategy(strategy, &token).await {
                Ok(record) => {
                    tracing::info!(strategy = strategy.name(), "Obtained Botnoi API key");
                    return Ok(record);
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "API key strategy failed");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }

    /// Full pipeline, reported as a response envelope.
    pub async fn get_api_key_complete(&self, credentials: &LoginCredentials) -> PipelineResponse {
        match self.run_pipeline(credentials).await {
            Ok(record) => PipelineResponse::ok(record),
            Err(e) => PipelineResponse::failed(e.to_string()),
        }
    }

    /// Ask Botnoi whether an API key is still accepted.
    pub async fn validate_api_key(&self, api_key: &str) -> bool {
        let url = format!("{}/validate", self.api_key_url.trim_end_matches('/'));

        match self
            .http
            .post(&url)
            .json(&serde_json::json!({ "apiKey": api_key }))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "API key validation request failed");
                false
            }
        }
    }
}

/// Check response status and return error if not successful.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = %status, body_len = body.len(), "Botnoi API key request failed");

    Err(ClientError::Fetch(format!("HTTP error! status: {}", status.as_u16())))
}

/// First non-empty string found under any of `aliases`.
pub fn resolve_alias<'a>(json: &'a Value, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|field| json.get(*field).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

/// Numeric field, absent or non-numeric reads as zero.
fn numeric_field(json: &Value, field: &str) -> f64 {
    match json.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Build a record from a JSON key response.
pub fn record_from_json(json: &Value) -> Option<ApiKeyRecord> {
    let api_key = resolve_alias(json, API_KEY_FIELDS)?;

    Some(ApiKeyRecord {
        api_key: api_key.to_string(),
        quota: numeric_field(json, QUOTA_FIELD),
        usage: numeric_field(json, USAGE_FIELD),
    })
}

/// Pattern-match a record out of an HTML page.
pub fn extract_from_html(html: &str) -> Option<ApiKeyRecord> {
    let api_key = API_KEY_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())?;

    Some(ApiKeyRecord {
        api_key,
        quota: capture_number(QUOTA_PATTERN.as_ref(), html),
        usage: capture_number(USAGE_PATTERN.as_ref(), html),
    })
}

fn capture_number(pattern: Option<&Regex>, html: &str) -> f64 {
    pattern
        .and_then(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_alias_follows_order() {
        let body = json!({"access_token": "A", "token": "T"});
        assert_eq!(resolve_alias(&body, TOKEN_FIELDS), Some("T"));

        let body = json!({"access_token": "A"});
        assert_eq!(resolve_alias(&body, TOKEN_FIELDS), Some("A"));

        let body = json!({"token": "", "access_token": "A"});
        assert_eq!(resolve_alias(&body, TOKEN_FIELDS), Some("A"));

        let body = json!({"token": 42});
        assert_eq!(resolve_alias(&body, TOKEN_FIELDS), None);
    }

    #[test]
    fn record_from_json_aliases_and_defaults() {
        let record = record_from_json(&json!({"key": "K3"})).unwrap();
        assert_eq!(record.api_key, "K3");
        assert_eq!(record.quota, 0.0);
        assert_eq!(record.usage, 0.0);

        let record = record_from_json(&json!({"api_key": "K2", "quota": 50, "usage": 7.5})).unwrap();
        assert_eq!(record.api_key, "K2");
        assert_eq!(record.quota, 50.0);
        assert_eq!(record.usage, 7.5);

        assert!(record_from_json(&json!({"quota": 10})).is_none());
    }

    #[test]
    fn extract_from_html_finds_key_quota_usage() {
        let html = r#"
            <script>
              window.__DATA__ = { "apiKey": "abc123XYZ", "Quota" : 1000, usage=12 };
            </script>
        "#;
        let record = extract_from_html(html).unwrap();
        assert_eq!(record.api_key, "abc123XYZ");
        assert_eq!(record.quota, 1000.0);
        assert_eq!(record.usage, 12.0);
    }

    #[test]
    fn extract_from_html_snake_case_without_numbers() {
        let record = extract_from_html(r#"<pre>api_key: "K2"</pre>"#).unwrap();
        assert_eq!(record.api_key, "K2");
        assert_eq!(record.quota, 0.0);
        assert_eq!(record.usage, 0.0);
    }

    #[test]
    fn extract_from_html_case_insensitive() {
        let record = extract_from_html("API_KEY=UPPER-1").unwrap();
        assert_eq!(record.api_key, "UPPER-1");
    }

    #[test]
    fn extract_from_html_no_match() {
        assert!(extract_from_html("<html><body>Please sign in</body></html>").is_none());
    }

    #[test]
    fn strategy_order_is_json_first() {
        assert_eq!(
            KeyStrategy::ORDER,
            [KeyStrategy::Json, KeyStrategy::HtmlScrape]
        );
    }
}
