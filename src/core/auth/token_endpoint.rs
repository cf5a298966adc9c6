use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::auth::CachedToken;
use crate::core::errors::TransportError;

/// Everything the token exchange can report. Classification into the public
/// taxonomy happens later; this keeps the HTTP details around for it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenExchangeError {
    #[error("token endpoint unreachable: {0}")]
    Transport(TransportError),

    #[error("token endpoint returned HTTP {status}")]
    Rejected {
        status: u16,
        body: Option<Value>,
        retry_after: Option<Duration>,
    },

    #[error("token endpoint response is invalid: {reason}")]
    InvalidResponse {
        status: Option<u16>,
        reason: String,
        body: Option<Value>,
    },
}

/// Trades a signed assertion for an access token.
///
/// The core only cares that *something* can do this exchange; the reqwest
/// implementation lives in the infra layer and tests can swap in a fake.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange(
        &self,
        assertion: &str,
        token_endpoint: &str,
    ) -> Result<CachedToken, TokenExchangeError>;
}
