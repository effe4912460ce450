//! HTTP client for the Luminate music analytics API.
//!
//! Authenticates once per client, either with a pre-issued token or by
//! exchanging username and password at `/auth`. There is no token refresh
//! and no retry: a non-success status becomes `FetchOutcome::Failed`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use streamwatch_core::config::LuminateConfig;
use streamwatch_core::{FetchOutcome, FetchQuery};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::Fetcher;

pub const ACCEPT: &str = "application/vnd.luminate-data.svc-apibff.v1+json";

const ERROR_EXCERPT_CHARS: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("client not configured: {0}")]
    NotConfigured(String),
}

enum Credentials {
    Token,
    Login { username: String, password: String },
}

pub struct LuminateClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    credentials: Credentials,
    token: OnceCell<String>,
}

impl std::fmt::Debug for LuminateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LuminateClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.initialized())
            .finish_non_exhaustive()
    }
}

impl LuminateClient {
    /// Build a client. Requires an API key plus either a token or a login.
    pub fn from_config(config: &LuminateConfig) -> Result<Self, FetchError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| FetchError::NotConfigured("LUM_API_KEY is not set".into()))?;

        let (credentials, token) = match (&config.auth_token, &config.username, &config.password) {
            (Some(token), _, _) => (Credentials::Token, OnceCell::new_with(Some(token.clone()))),
            (None, Some(username), Some(password)) => (
                Credentials::Login {
                    username: username.clone(),
                    password: password.clone(),
                },
                OnceCell::new(),
            ),
            _ => {
                return Err(FetchError::NotConfigured(
                    "set LUM_AUTH_TOKEN or both LUM_USERNAME and LUM_PASSWORD".into(),
                ))
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            credentials,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn recording_url(&self, isrc: &str) -> String {
        format!("{}/musical_recordings/{}", self.base_url, isrc)
    }

    async fn token(&self) -> Result<&str, FetchError> {
        self.token
            .get_or_try_init(|| self.authenticate())
            .await
            .map(String::as_str)
    }

    /// Exchange username and password for an access token.
    async fn authenticate(&self) -> Result<String, FetchError> {
        let Credentials::Login { username, password } = &self.credentials else {
            return Err(FetchError::NotConfigured("no login credentials".into()));
        };

        let url = format!("{}/auth", self.base_url);
        debug!("Luminate auth request to {}", url);

        let response = self
            .http
            .post(&url)
            .header("Accept", ACCEPT)
            .header("x-api-key", &self.api_key)
            .form(&[("username", username.as_str()), ("password", password.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if status != 200 {
            return Err(FetchError::Auth {
                status,
                message: error_message(&body),
            });
        }

        let json: Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        let token = token_from(&json)
            .ok_or_else(|| FetchError::Parse("missing access_token in auth response".into()))?;
        tracing::info!("authenticated with Luminate API");
        Ok(token)
    }

    /// Request one recording. Non-success statuses are outcomes, not errors.
    pub async fn fetch_recording(
        &self,
        isrc: &str,
        query: &FetchQuery,
    ) -> Result<FetchOutcome, FetchError> {
        let token = self.token().await?;
        let url = self.recording_url(isrc);

        let mut params: Vec<(&str, String)> = vec![("ID_Type", "ISRC".to_string())];
        params.extend(query.params());
        debug!(isrc, ?params, "Luminate request to {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", ACCEPT)
            .header("x-api-key", &self.api_key)
            .header("authorization", token)
            .query(&params)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(classify(status, &body))
    }
}

#[async_trait]
impl Fetcher for LuminateClient {
    async fn fetch(&self, isrc: &str, query: &FetchQuery) -> FetchOutcome {
        match self.fetch_recording(isrc, query).await {
            Ok(outcome) => outcome,
            Err(e) => FetchOutcome::failed(e.to_string()),
        }
    }
}

/// Map a status code and raw body to an outcome.
pub fn classify(status: u16, body: &str) -> FetchOutcome {
    match status {
        200 if body.trim().is_empty() => FetchOutcome::Empty,
        200 => match serde_json::from_str(body) {
            Ok(json) => FetchOutcome::from_body(json),
            Err(e) => FetchOutcome::failed(format!("invalid JSON body: {e}")),
        },
        204 => FetchOutcome::Empty,
        401 => FetchOutcome::failed(format!("unauthorized (401): {}", error_message(body))),
        403 => FetchOutcome::failed(format!(
            "forbidden (403), check API permissions: {}",
            error_message(body)
        )),
        404 => FetchOutcome::failed("recording not found (404)"),
        500..=599 => FetchOutcome::failed(format!(
            "server error ({status}): {}",
            error_message(body)
        )),
        _ => FetchOutcome::failed(format!("HTTP {status}: {}", error_message(body))),
    }
}

/// `error.message` from a JSON error body, else a short excerpt of the text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(ERROR_EXCERPT_CHARS).collect())
}

fn token_from(auth_response: &Value) -> Option<String> {
    ["access_token", "token"]
        .iter()
        .find_map(|k| auth_response.get(*k)?.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> LuminateConfig {
        LuminateConfig {
            base_url: "https://api.example.test/".into(),
            api_key: Some("key".into()),
            auth_token: Some("tok".into()),
            ..Default::default()
        }
    }

    #[test]
    fn success_bodies() {
        assert_eq!(
            classify(200, r#"{"metrics": []}"#),
            FetchOutcome::Data {
                response: json!({ "metrics": [] })
            }
        );
        assert_eq!(classify(200, "{}"), FetchOutcome::Empty);
        assert_eq!(classify(200, "  "), FetchOutcome::Empty);
        assert_eq!(classify(204, ""), FetchOutcome::Empty);
        assert!(classify(200, "<html>").is_failed());
    }

    #[test]
    fn failure_reasons_carry_status_and_message() {
        let body = r#"{"error": {"message": "Invalid date range"}}"#;
        assert_eq!(
            classify(500, body),
            FetchOutcome::failed("server error (500): Invalid date range")
        );
        assert_eq!(
            classify(404, ""),
            FetchOutcome::failed("recording not found (404)")
        );
        assert_eq!(
            classify(429, "slow down"),
            FetchOutcome::failed("HTTP 429: slow down")
        );
        match classify(401, "x".repeat(500).as_str()) {
            FetchOutcome::Failed { reason } => {
                assert_eq!(reason.len(), "unauthorized (401): ".len() + ERROR_EXCERPT_CHARS)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn token_field_fallbacks() {
        assert_eq!(token_from(&json!({ "access_token": "a" })), Some("a".into()));
        assert_eq!(token_from(&json!({ "token": "b" })), Some("b".into()));
        assert_eq!(token_from(&json!({ "access_token": "" })), None);
        assert_eq!(token_from(&json!({ "expires_in": 3600 })), None);
    }

    #[test]
    fn client_requires_key_and_credentials() {
        let client = LuminateClient::from_config(&config()).unwrap();
        assert_eq!(client.base_url(), "https://api.example.test");
        assert_eq!(
            client.recording_url("USRC17607839"),
            "https://api.example.test/musical_recordings/USRC17607839"
        );

        let no_key = LuminateConfig {
            api_key: None,
            ..config()
        };
        assert!(matches!(
            LuminateClient::from_config(&no_key),
            Err(FetchError::NotConfigured(_))
        ));

        let no_login = LuminateConfig {
            auth_token: None,
            username: Some("user".into()),
            ..config()
        };
        assert!(matches!(
            LuminateClient::from_config(&no_login),
            Err(FetchError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn pre_issued_token_skips_auth() {
        let client = LuminateClient::from_config(&config()).unwrap();
        assert_eq!(client.token().await.unwrap(), "tok");
    }
}
