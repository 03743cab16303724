//! BmcApi trait for mocking
//!
//! This trait abstracts the BMC client so the reconciler can be exercised in
//! unit tests with scripted responses. The concrete `BmcClient` implements
//! it against the real provisioning API.

use crate::error::BmcError;
use crate::models::ApiResponse;

/// Trait for BMC provisioning API operations.
///
/// All methods return the raw [`ApiResponse`]; only transport-level failures
/// surface as [`BmcError`].
#[async_trait::async_trait]
pub trait BmcApi: Send + Sync {
    /// `POST {base}/servers` with the desired-spec JSON body.
    async fn create_server(&self, body: &serde_json::Value) -> Result<ApiResponse, BmcError>;

    /// `GET {base}/servers/{id}`.
    async fn get_server(&self, server_id: &str) -> Result<ApiResponse, BmcError>;

    /// `DELETE {base}/servers/{id}`.
    async fn delete_server(&self, server_id: &str) -> Result<ApiResponse, BmcError>;
}
