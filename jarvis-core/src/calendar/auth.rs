//! OAuth2 installed-app flow for the Calendar and Tasks APIs.
//!
//! The token blob is stored as a single JSON file which is overwritten in
//! full on every save and read once when the client is constructed.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calendar::error::CalendarError;

pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const OUT_OF_BAND_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/tasks",
];

/// Refresh slightly before the reported expiry so in-flight requests don't race it.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_endpoint: String,
}

impl OAuthConfig {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri: OUT_OF_BAND_REDIRECT.to_string(),
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn authorization_url(&self) -> Result<String, CalendarError> {
        if self.client_id.trim().is_empty() {
            return Err(CalendarError::Auth(
                "Google client id is not configured".to_string(),
            ));
        }

        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            AUTH_ENDPOINT,
            &[
                ("access_type", "offline"),
                ("scope", scope.as_str()),
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )
        .map_err(|e| CalendarError::Auth(format!("Invalid authorization url: {e}")))?;

        Ok(url.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenSet {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .map(|expiry| expiry <= now + Duration::seconds(EXPIRY_MARGIN_SECS))
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Refresh responses omit the refresh token; keep the one we already had.
    fn into_token_set(self, now: DateTime<Utc>, previous_refresh: Option<String>) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expiry: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

pub async fn exchange_code(
    http: &Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenSet, CalendarError> {
    let response = request_token(
        http,
        config,
        &[
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ],
    )
    .await?;

    info!("Authorization code exchanged for token");
    Ok(response.into_token_set(Utc::now(), None))
}

pub async fn refresh(
    http: &Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> Result<TokenSet, CalendarError> {
    let response = request_token(
        http,
        config,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await?;

    debug!("Access token refreshed");
    Ok(response.into_token_set(Utc::now(), Some(refresh_token.to_string())))
}

async fn request_token(
    http: &Client,
    config: &OAuthConfig,
    grant: &[(&str, &str)],
) -> Result<TokenResponse, CalendarError> {
    let mut params: Vec<(&str, &str)> = vec![
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    params.extend_from_slice(grant);

    let response = http
        .post(&config.token_endpoint)
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CalendarError::Auth(format!(
            "Token request failed ({status}): {body}"
        )));
    }

    Ok(response.json::<TokenResponse>().await?)
}

/// Whole-file JSON persistence for the OAuth token blob.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns `None` when no token has been saved yet.
    pub fn load(&self) -> Result<Option<TokenSet>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;

        let tokens = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file: {}", self.path.display()))?;

        Ok(Some(tokens))
    }

    pub fn save(&self, tokens: &TokenSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(tokens).context("Failed to serialize token")?;

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write token file: {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
