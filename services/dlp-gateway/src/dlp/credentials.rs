use std::fmt;
use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::CredentialsError;
use crate::config::CredentialsSource;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a service account JSON key the gateway needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now + REFRESH_MARGIN_SECS < self.expires_at
    }
}

/// Exchanges signed JWT assertions for OAuth access tokens and caches them.
pub struct ServiceAccountTokens {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    encoding_key: EncodingKey,
    http_client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, http_client: Client) -> Result<Self, CredentialsError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;

        Ok(Self {
            client_email: key.client_email,
            key_id: key.private_key_id,
            token_uri: key.token_uri,
            encoding_key,
            http_client,
            cached: Mutex::new(None),
        })
    }

    pub async fn access_token(&self) -> Result<String, CredentialsError> {
        // Held across the exchange so concurrent requests share one refresh.
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.exchange(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    #[instrument(skip(self), fields(client_email = %self.client_email))]
    async fn exchange(&self, now: i64) -> Result<CachedToken, CredentialsError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let assertion = encode(&header, &claims, &self.encoding_key)?;

        debug!(token_uri = %self.token_uri, "exchanging service account assertion");

        let response = self
            .http_client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| exchange_error("token request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| exchange_error("failed to read token error body", e))?;
            return Err(CredentialsError::Exchange(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| exchange_error("invalid token response", e))?;

        info!(expires_in = token.expires_in, "obtained DLP access token");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: token_expiry(now, token.expires_in),
        })
    }
}

fn exchange_error(context: &str, err: reqwest::Error) -> CredentialsError {
    if err.is_timeout() {
        CredentialsError::Timeout
    } else {
        CredentialsError::Exchange(format!("{}: {}", context, err))
    }
}

/// Tokens never outlive the assertion that minted them.
fn token_expiry(now: i64, expires_in: i64) -> i64 {
    now.saturating_add(expires_in.clamp(0, ASSERTION_LIFETIME_SECS))
}

/// Supplies bearer tokens for DLP calls.
pub enum TokenSource {
    Static(String),
    ServiceAccount(ServiceAccountTokens),
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("TokenSource::Static"),
            TokenSource::ServiceAccount(tokens) => f
                .debug_tuple("TokenSource::ServiceAccount")
                .field(&tokens.client_email)
                .finish(),
        }
    }
}

impl TokenSource {
    pub fn from_config(
        source: &CredentialsSource,
        http_client: Client,
    ) -> Result<Self, CredentialsError> {
        match source {
            CredentialsSource::AccessToken(token) => Ok(TokenSource::Static(token.clone())),
            CredentialsSource::ServiceAccountFile(path) => {
                let key = ServiceAccountKey::from_file(path)?;
                info!(
                    client_email = %key.client_email,
                    path = %path.display(),
                    "loaded service account credentials"
                );
                Ok(TokenSource::ServiceAccount(ServiceAccountTokens::new(
                    key,
                    http_client,
                )?))
            }
        }
    }

    pub async fn access_token(&self) -> Result<String, CredentialsError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount(tokens) => tokens.access_token().await,
        }
    }
}
