//! Bearer-token acquisition for the Google REST APIs.
//!
//! Inside Google Cloud (Cloud Functions, GCE, Cloud Run) the instance
//! metadata server hands out access tokens for the attached service
//! account — that is the "implicit credentials" the deployed system runs
//! on. For local runs, `GOOGLE_OAUTH_ACCESS_TOKEN` short-circuits the
//! metadata server entirely.
//!
//! Tokens are cached until shortly before expiry so one invocation's many
//! API calls (probe loop, OCR polls, shard downloads, upload) do not each
//! hit the metadata server.

use crate::error::Pdf2AudioError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Default metadata-server token endpoint.
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Environment variable overriding token acquisition for local runs.
pub const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Refresh this long before the reported expiry to avoid using a token
/// that dies mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of OAuth2 bearer tokens for the Google API clients.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String, Pdf2AudioError>;
}

/// Fixed token, used when [`TOKEN_ENV_VAR`] is set.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, Pdf2AudioError> {
        Ok(self.0.clone())
    }
}

/// Tokens fetched from the GCE/Cloud-Functions metadata server, cached
/// until [`EXPIRY_MARGIN`] before expiry.
pub struct MetadataServerTokens {
    client: reqwest::Client,
    url: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    refresh_after: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl MetadataServerTokens {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_url(client, METADATA_TOKEN_URL)
    }

    /// Test hook: point at a non-default token endpoint.
    pub fn with_url(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, Pdf2AudioError> {
        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Pdf2AudioError::Auth {
                detail: format!("metadata server unreachable: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(Pdf2AudioError::Auth {
                detail: format!("metadata server returned HTTP {}", response.status()),
            });
        }

        let body: TokenResponse =
            response.json().await.map_err(|e| Pdf2AudioError::Auth {
                detail: format!("malformed token response: {e}"),
            })?;

        let ttl = Duration::from_secs(body.expires_in);
        debug!("Fetched access token, expires in {}s", body.expires_in);

        Ok(CachedToken {
            token: body.access_token,
            refresh_after: Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

#[async_trait]
impl TokenProvider for MetadataServerTokens {
    async fn access_token(&self) -> Result<String, Pdf2AudioError> {
        let mut cached = self.cached.lock().await;
        if let Some(ref c) = *cached {
            if Instant::now() < c.refresh_after {
                return Ok(c.token.clone());
            }
        }
        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

/// Pick a token source the way the deployed function does: env override
/// first, metadata server otherwise.
pub fn from_env(client: reqwest::Client) -> std::sync::Arc<dyn TokenProvider> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.is_empty() => {
            debug!("Using access token from {}", TOKEN_ENV_VAR);
            std::sync::Arc::new(StaticToken::new(token))
        }
        _ => std::sync::Arc::new(MetadataServerTokens::new(client)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_returns_value() {
        let provider = StaticToken::new("ya29.test");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.test");
    }

    #[tokio::test]
    async fn metadata_fetch_failure_is_auth_error() {
        // Nothing listens on this port; the fetch must surface as Auth.
        let provider = MetadataServerTokens::with_url(
            reqwest::Client::new(),
            "http://127.0.0.1:1/token",
        );
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, Pdf2AudioError::Auth { .. }));
    }
}
