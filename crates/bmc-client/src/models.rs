//! BMC API response model
//!
//! The client hands back the raw status code and body and leaves
//! classification to the controller, which owns the code-to-outcome tables.

/// A response obtained from the provisioning API.
///
/// Transport-level failures (no response at all) are reported as
/// [`crate::BmcError`] instead.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub code: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Convenience constructor, mostly for tests.
    #[must_use]
    pub fn new(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            body: body.into(),
        }
    }
}
