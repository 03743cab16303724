//! Mock BMC client for unit testing
//!
//! Responses are scripted per operation and consumed in order, and every
//! invocation is recorded, so tests can assert both what the reconciler did
//! and what it never called (no-double-create, deletion safety).

use crate::bmc_trait::BmcApi;
use crate::error::BmcError;
use crate::models::ApiResponse;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded invocation of the mock client.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// `create_server` with the serialized spec body.
    Create(serde_json::Value),
    /// `get_server` with the remote identifier.
    Get(String),
    /// `delete_server` with the remote identifier.
    Delete(String),
}

/// Scripted mock implementation of [`BmcApi`].
#[derive(Debug, Default)]
pub struct MockBmcClient {
    create: Mutex<VecDeque<Result<ApiResponse, BmcError>>>,
    get: Mutex<VecDeque<Result<ApiResponse, BmcError>>>,
    delete: Mutex<VecDeque<Result<ApiResponse, BmcError>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockBmcClient {
    /// Creates a mock with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `create_server` response.
    pub fn queue_create(&self, response: Result<ApiResponse, BmcError>) {
        self.create.lock().unwrap().push_back(response);
    }

    /// Scripts the next `get_server` response.
    pub fn queue_get(&self, response: Result<ApiResponse, BmcError>) {
        self.get.lock().unwrap().push_back(response);
    }

    /// Scripts the next `delete_server` response.
    pub fn queue_delete(&self, response: Result<ApiResponse, BmcError>) {
        self.delete.lock().unwrap().push_back(response);
    }

    /// Every invocation made against the mock, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(
        queue: &Mutex<VecDeque<Result<ApiResponse, BmcError>>>,
        operation: &str,
    ) -> Result<ApiResponse, BmcError> {
        queue.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(BmcError::Transport(format!(
                "no scripted response for {operation}"
            )))
        })
    }
}

#[async_trait::async_trait]
impl BmcApi for MockBmcClient {
    async fn create_server(&self, body: &serde_json::Value) -> Result<ApiResponse, BmcError> {
        self.record(MockCall::Create(body.clone()));
        Self::next(&self.create, "create_server")
    }

    async fn get_server(&self, server_id: &str) -> Result<ApiResponse, BmcError> {
        self.record(MockCall::Get(server_id.to_owned()));
        Self::next(&self.get, "get_server")
    }

    async fn delete_server(&self, server_id: &str) -> Result<ApiResponse, BmcError> {
        self.record(MockCall::Delete(server_id.to_owned()));
        Self::next(&self.delete, "delete_server")
    }
}
