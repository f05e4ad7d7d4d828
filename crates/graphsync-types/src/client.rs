//! Search backend client capability.
//!
//! The HTTP client talking to the index backend lives outside this
//! workspace; the core only depends on this trait. All calls are
//! synchronous from the core's point of view and carry their own
//! timeout at the collaborator boundary.

use crate::document::IndexAction;
use crate::error::TransportError;
use serde_json::Value;

/// Outcome of a backend call that reached the backend.
///
/// Transport-level failures (backend unreachable) are reported as
/// [`TransportError`] instead, never encoded in here.
#[derive(Debug, Clone)]
pub struct ClientResult {
    /// Whether the backend accepted the request
    pub succeeded: bool,

    /// Backend-reported error detail, if any
    pub error_message: Option<String>,

    /// Raw response body
    pub body: String,
}

impl ClientResult {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            error_message: None,
            body: body.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error_message: Some(message.into()),
            body: String::new(),
        }
    }

    pub fn error_message(&self) -> &str {
        self.error_message.as_deref().unwrap_or("unknown error")
    }
}

/// Capability for talking to the search index backend.
///
/// Implementations may be multi-connection internally; the core calls
/// in from multiple threads concurrently.
pub trait SearchIndexClient: Send + Sync {
    /// Apply a single write action.
    fn execute(&self, action: &IndexAction) -> Result<ClientResult, TransportError>;

    /// Apply a batch of write actions in one request.
    fn bulk(&self, actions: &[IndexAction]) -> Result<ClientResult, TransportError>;

    /// Run an opaque query payload against one index; the body carries
    /// the backend's hit envelope.
    fn search(&self, index: &str, query: &str) -> Result<ClientResult, TransportError>;

    fn index_exists(&self, index: &str) -> Result<bool, TransportError>;

    fn create_index(&self, index: &str) -> Result<ClientResult, TransportError>;

    /// Apply a schema mapping to an existing index.
    fn put_mapping(&self, index: &str, schema: &Value) -> Result<ClientResult, TransportError>;
}
