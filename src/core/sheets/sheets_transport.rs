use std::time::Duration;

use async_trait::async_trait;

use crate::core::errors::TransportError;
use crate::core::sheets::HttpRequestDescriptor;

/// What came back from the spreadsheet API, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` header (seconds form only).
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a built request. Implementations only move bytes; status codes are
/// interpreted by the service.
#[async_trait]
pub trait SheetsTransport: Send + Sync {
    async fn send(&self, request: &HttpRequestDescriptor) -> Result<HttpResponse, TransportError>;
}
