use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::errors::{auth_context, with_parse_context};
use crate::http::HttpClient;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for the analytics API
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, for local fakes and tests
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// The fields of a service account key file this crate uses
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;
        with_parse_context(serde_json::from_str(&text), "service account key")
    }

    /// Signed RS256 assertion for the JWT bearer grant
    pub fn sign_assertion(&self, scope: &str, now: DateTime<Utc>) -> Result<String> {
        #[derive(Debug, Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: i64,
            exp: i64,
        }

        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .context("Service account private key is not a valid RSA PEM")?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .context("Failed to sign service account assertion")
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Exchanges a service account key for short-lived access tokens.
///
/// The key file is read on every exchange rather than at construction, so a
/// missing or rotated key only affects the calls made while it is missing.
pub struct ServiceAccountTokenProvider {
    http: HttpClient,
    key_file: PathBuf,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(http: HttpClient, key_file: impl Into<PathBuf>, scope: impl Into<String>) -> Self {
        Self {
            http,
            key_file: key_file.into(),
            scope: scope.into(),
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken> {
        let key = ServiceAccountKey::from_file(&self.key_file)?;
        let assertion = key.sign_assertion(&self.scope, now)?;
        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response: TokenResponse = self.http.post_form(&key.token_uri, &form).await?;
        info!("Obtained analytics access token for {}", key.client_email);

        Ok(CachedToken {
            value: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            debug!("Reusing cached analytics access token");
            return Ok(token.value.clone());
        }

        let key_file = self.key_file.display().to_string();
        let token = self
            .exchange(now)
            .await
            .with_context(|| auth_context(&key_file))?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}
