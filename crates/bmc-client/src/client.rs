//! BMC provisioning API client
//!
//! Implements the server provisioning endpoints:
//! `POST /servers`, `GET /servers/{id}`, `DELETE /servers/{id}`.

use crate::auth::TokenProvider;
use crate::bmc_trait::BmcApi;
use crate::config::BmcConfig;
use crate::error::BmcError;
use crate::models::ApiResponse;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// BMC provisioning API client.
///
/// Requests carry a bearer token from the client-credentials exchange and a
/// 30 second timeout, so a hung provisioning call fails the pass instead of
/// blocking the reconcile loop indefinitely.
#[derive(Debug)]
pub struct BmcClient {
    http: Client,
    base_url: String,
    auth: TokenProvider,
}

impl BmcClient {
    /// Creates a new client from validated connection configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BmcError::Http`] when the underlying HTTP client cannot be
    /// built.
    pub fn new(config: &BmcConfig) -> Result<Self, BmcError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let auth = TokenProvider::new(http.clone(), config);

        Ok(Self {
            http,
            base_url: config.endpoint_url.trim_end_matches('/').to_owned(),
            auth,
        })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validates credentials by performing a token exchange.
    ///
    /// Run once at startup so bad credentials fail the process instead of
    /// failing every reconcile pass.
    ///
    /// # Errors
    ///
    /// Returns [`BmcError::Authentication`] for rejected credentials and
    /// [`BmcError::Http`] for an unreachable token endpoint.
    pub async fn validate_credentials(&self) -> Result<(), BmcError> {
        self.auth.bearer_token().await.map(|_| ())
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<ApiResponse, BmcError> {
        let token = self.auth.bearer_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let code = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(code, "BMC API response");
        Ok(ApiResponse { code, body })
    }
}

#[async_trait::async_trait]
impl BmcApi for BmcClient {
    async fn create_server(&self, body: &serde_json::Value) -> Result<ApiResponse, BmcError> {
        let url = format!("{}/servers", self.base_url);
        debug!(%url, "creating BMC server");
        self.execute(self.http.post(&url).json(body)).await
    }

    async fn get_server(&self, server_id: &str) -> Result<ApiResponse, BmcError> {
        let url = format!("{}/servers/{}", self.base_url, server_id);
        self.execute(self.http.get(&url)).await
    }

    async fn delete_server(&self, server_id: &str) -> Result<ApiResponse, BmcError> {
        let url = format!("{}/servers/{}", self.base_url, server_id);
        debug!(%url, "deleting BMC server");
        self.execute(self.http.delete(&url)).await
    }
}
