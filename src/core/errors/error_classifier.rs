// =============================================================================
// ERROR CLASSIFIER
// =============================================================================
//
// Every failure on the way to the spreadsheet API ends up here and leaves as a
// `ClassifiedError` with one of nine fixed kinds. Callers branch on `kind`,
// never on message text.
//
// **Rule order matters.** The table below is evaluated top to bottom and the
// first match wins:
//
//   1. no response at all (connect error, timeout)  -> NetworkFailure
//   2. HTTP 401 / 403                               -> AuthorizationFailure
//   3. HTTP 404                                     -> RemoteNotFound
//   4. HTTP 429                                     -> RateLimited
//   5. HTTP 5xx                                     -> RemoteServerError
//   6. credential / signing / token-exchange checks -> pass-through kind
//   7. anything else                                -> Unknown
//
// The HTTP rules see statuses from both the token endpoint and the values
// endpoint, so a 503 from the token endpoint is still a retryable server error.
//
// **Messages are caller-safe.** They are built from our own error types and
// from the `message` / `error_description` fields of remote error bodies,
// never from key material, tokens, or arbitrary panic/exception text.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::core::auth::{SigningError, TokenExchangeError};
use crate::core::credentials::CredentialError;

// ============================================================================
// CLASSIFIED OUTPUT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CredentialValidation,
    SigningFailure,
    TokenExchangeFailure,
    RateLimited,
    AuthorizationFailure,
    RemoteNotFound,
    RemoteServerError,
    NetworkFailure,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CredentialValidation => "credential_validation",
            ErrorKind::SigningFailure => "signing_failure",
            ErrorKind::TokenExchangeFailure => "token_exchange_failure",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::AuthorizationFailure => "authorization_failure",
            ErrorKind::RemoteNotFound => "remote_not_found",
            ErrorKind::RemoteServerError => "remote_server_error",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Transient kinds that a caller may retry with backoff. Everything else
    /// points at a configuration or request defect.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailure | ErrorKind::RateLimited | ErrorKind::RemoteServerError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized failure. Built once where the failure is detected and passed
/// upward unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    pub remote_payload: Option<Value>,
    pub retry_after: Option<Duration>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            remote_payload: None,
            retry_after: None,
        }
    }

    /// The refresh task went away without reporting back.
    pub(crate) fn refresh_aborted() -> Self {
        Self::new(
            ErrorKind::TokenExchangeFailure,
            "Token refresh was aborted before it completed",
        )
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

// ============================================================================
// RAW INPUT
// ============================================================================

/// Why a request never got a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    TimedOut,

    #[error("could not connect to {host}")]
    Connect { host: String },

    #[error("request failed: {0}")]
    Request(String),
}

/// A non-2xx response from the spreadsheet API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFailure {
    pub status: u16,
    /// Parsed JSON body, or the text body as a JSON string if it was not JSON.
    pub body: Option<Value>,
    pub retry_after: Option<Duration>,
}

/// Keeps a remote body for diagnostics: JSON if it parses, `None` when empty,
/// otherwise the text itself as a JSON string.
pub fn parse_remote_body(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}

/// Everything that can go wrong, before classification.
#[derive(Debug, Clone)]
pub enum Failure {
    Credential(CredentialError),
    Signing(SigningError),
    TokenExchange(TokenExchangeError),
    Transport(TransportError),
    Http(HttpFailure),
    /// A 2xx body that could not be decoded.
    Decode(String),
    /// The logical operation itself was unusable (empty range, ragged rows).
    InvalidOperation(String),
    /// A failure we have no structure for. The detail is kept for debugging
    /// and never copied into the caller-facing message.
    Unrecognized(Option<String>),
}

impl Failure {
    fn status(&self) -> Option<u16> {
        match self {
            Failure::Http(http) => Some(http.status),
            Failure::TokenExchange(TokenExchangeError::Rejected { status, .. }) => Some(*status),
            Failure::TokenExchange(TokenExchangeError::InvalidResponse { status, .. }) => *status,
            _ => None,
        }
    }

    fn payload(&self) -> Option<Value> {
        match self {
            Failure::Http(http) => http.body.clone(),
            Failure::TokenExchange(TokenExchangeError::Rejected { body, .. })
            | Failure::TokenExchange(TokenExchangeError::InvalidResponse { body, .. }) => {
                body.clone()
            }
            _ => None,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Failure::Http(http) => http.retry_after,
            Failure::TokenExchange(TokenExchangeError::Rejected { retry_after, .. }) => {
                *retry_after
            }
            _ => None,
        }
    }

    fn safe_message(&self) -> String {
        match self {
            Failure::Credential(err) => err.to_string(),
            Failure::Signing(err) => err.to_string(),
            Failure::TokenExchange(TokenExchangeError::Transport(err)) => {
                format!("Token endpoint unreachable: {}", err)
            }
            Failure::TokenExchange(TokenExchangeError::Rejected { status, body, .. }) => {
                format!(
                    "Token exchange failed (HTTP {}): {}",
                    status,
                    remote_detail(body.as_ref())
                )
            }
            Failure::TokenExchange(TokenExchangeError::InvalidResponse { reason, .. }) => {
                format!("Token endpoint returned an invalid response: {}", reason)
            }
            Failure::Transport(err) => format!("Spreadsheet API unreachable: {}", err),
            Failure::Http(http) => format!(
                "Spreadsheet API error (HTTP {}): {}",
                http.status,
                remote_detail(http.body.as_ref())
            ),
            Failure::Decode(reason) => {
                format!("Spreadsheet API returned an unreadable response: {}", reason)
            }
            Failure::InvalidOperation(reason) => format!("Invalid spreadsheet operation: {}", reason),
            Failure::Unrecognized(_) => "Unexpected failure".to_string(),
        }
    }
}

impl From<CredentialError> for Failure {
    fn from(err: CredentialError) -> Self {
        Failure::Credential(err)
    }
}

impl From<SigningError> for Failure {
    fn from(err: SigningError) -> Self {
        Failure::Signing(err)
    }
}

impl From<TokenExchangeError> for Failure {
    fn from(err: TokenExchangeError) -> Self {
        Failure::TokenExchange(err)
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::Transport(err)
    }
}

// ============================================================================
// RULES
// ============================================================================

type Rule = (fn(&Failure) -> bool, ErrorKind);

/// Evaluated in order; first match wins. Do not reorder.
const CLASSIFICATION_RULES: &[Rule] = &[
    (has_no_response, ErrorKind::NetworkFailure),
    (is_unauthorized, ErrorKind::AuthorizationFailure),
    (is_not_found, ErrorKind::RemoteNotFound),
    (is_rate_limited, ErrorKind::RateLimited),
    (is_server_error, ErrorKind::RemoteServerError),
    (is_credential_failure, ErrorKind::CredentialValidation),
    (is_signing_failure, ErrorKind::SigningFailure),
    (is_token_exchange_failure, ErrorKind::TokenExchangeFailure),
];

fn has_no_response(failure: &Failure) -> bool {
    matches!(
        failure,
        Failure::Transport(_) | Failure::TokenExchange(TokenExchangeError::Transport(_))
    )
}

fn is_unauthorized(failure: &Failure) -> bool {
    matches!(failure.status(), Some(401) | Some(403))
}

fn is_not_found(failure: &Failure) -> bool {
    failure.status() == Some(404)
}

fn is_rate_limited(failure: &Failure) -> bool {
    failure.status() == Some(429)
}

fn is_server_error(failure: &Failure) -> bool {
    matches!(failure.status(), Some(500..=599))
}

fn is_credential_failure(failure: &Failure) -> bool {
    matches!(failure, Failure::Credential(_))
}

fn is_signing_failure(failure: &Failure) -> bool {
    matches!(failure, Failure::Signing(_))
}

fn is_token_exchange_failure(failure: &Failure) -> bool {
    matches!(failure, Failure::TokenExchange(_))
}

/// Normalizes a raw failure into a `ClassifiedError`.
pub fn classify(failure: Failure) -> ClassifiedError {
    let kind = CLASSIFICATION_RULES
        .iter()
        .find(|(matches, _)| matches(&failure))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown);

    ClassifiedError {
        kind,
        message: failure.safe_message(),
        http_status: failure.status(),
        remote_payload: failure.payload(),
        retry_after: if kind.is_retryable() {
            failure.retry_after()
        } else {
            None
        },
    }
}

/// Pulls a human-readable reason out of a remote error body.
///
/// Handles the Google API shape `{"error": {"message": ...}}` and the OAuth
/// shape `{"error": "...", "error_description": "..."}`.
fn remote_detail(body: Option<&Value>) -> String {
    let Some(body) = body else {
        return "no details".to_string();
    };

    if let Some(message) = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }

    match (
        body.get("error").and_then(Value::as_str),
        body.get("error_description").and_then(Value::as_str),
    ) {
        (Some(code), Some(description)) => format!("{} ({})", code, description),
        (Some(code), None) => code.to_string(),
        (None, Some(description)) => description.to_string(),
        (None, None) => match body {
            Value::String(text) if !text.trim().is_empty() => truncate(text.trim(), 200),
            _ => "no details".to_string(),
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}
