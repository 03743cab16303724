//! OAuth2 client-credentials token provider
//!
//! The provisioning API authenticates with a bearer token obtained through a
//! client-credentials exchange. Tokens are cached until shortly before their
//! reported expiry; callers just ask for a bearer token and the provider
//! refreshes transparently.

use crate::config::BmcConfig;
use crate::error::BmcError;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Scopes requested for the provisioning API.
const SCOPES: &str = "bmc bmc.read";

/// Refresh this long before the token's reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Fetches and caches bearer tokens for the provisioning API.
#[derive(Debug)]
pub struct TokenProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider from the connection configuration, sharing the
    /// client's HTTP connection pool.
    #[must_use]
    pub fn new(http: Client, config: &BmcConfig) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cached: Mutex::new(None),
        }
    }

    /// Returns a bearer token, exchanging credentials if the cached one is
    /// missing or about to expire.
    ///
    /// # Errors
    ///
    /// Returns [`BmcError::Http`] when the token endpoint is unreachable and
    /// [`BmcError::Authentication`] when it rejects the credentials.
    pub async fn bearer_token(&self) -> Result<String, BmcError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        debug!("Exchanging client credentials for a new BMC token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", SCOPES),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BmcError::Authentication(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BmcError::Authentication(format!("malformed token response: {e}")))?;

        let refresh_at = refresh_deadline(Instant::now(), token.expires_in);

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at,
        });
        Ok(token.access_token)
    }
}

/// Instant at which a token obtained at `now` should be refreshed: the
/// margin before its reported expiry, falling back to the default lifetime
/// when the endpoint omits one. Lifetimes shorter than the margin refresh
/// immediately rather than underflowing.
fn refresh_deadline(now: Instant, expires_in: Option<u64>) -> Instant {
    let lifetime = expires_in.map_or(DEFAULT_LIFETIME, Duration::from_secs);
    now + lifetime.saturating_sub(EXPIRY_MARGIN)
}
