// =============================================================================
// ASSERTION SIGNER
// =============================================================================
//
// Builds the signed JWT used in the OAuth2 JWT-bearer grant:
//
//   base64url(header) . base64url(claims) . base64url(RS256 signature)
//
// The header is always `{"alg":"RS256","typ":"JWT"}`. The claims name the
// service account as issuer, the requested scope, and the token endpoint as
// audience. Google rejects assertions that live longer than one hour, so the
// lifetime is capped at 3600 seconds.
//
// Signing is pure: the caller passes the current time in, which keeps tests
// deterministic and keeps this module free of any clock or network access.

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::credentials::ValidatedCredentials;

/// Longest assertion lifetime the token endpoint accepts.
pub const MAX_ASSERTION_LIFETIME_SECS: i64 = 3600;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Options for one assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionConfig {
    /// Space-separated OAuth scopes.
    pub scope: String,

    /// Token endpoint URL; becomes the `aud` claim.
    pub audience: String,

    /// Validity window in seconds, must be in `(0, 3600]`.
    pub lifetime_seconds: i64,
}

impl Default for AssertionConfig {
    fn default() -> Self {
        Self {
            scope: SPREADSHEETS_SCOPE.to_string(),
            audience: DEFAULT_TOKEN_URI.to_string(),
            lifetime_seconds: MAX_ASSERTION_LIFETIME_SECS,
        }
    }
}

/// JWT claims for the Google OAuth2 JWT-bearer grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    /// Issuer (service account email).
    pub iss: String,

    /// Scope (what APIs we want access to).
    pub scope: String,

    /// Audience (token endpoint).
    pub aud: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration (Unix timestamp, at most 1 hour after iat).
    pub exp: i64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    #[error("Invalid assertion configuration: {0}")]
    InvalidConfig(String),

    #[error("Private key is not a PEM-encoded PKCS#8 key: {0}")]
    MalformedPem(String),

    #[error("Private key could not be used for RS256 signing: {0}")]
    InvalidKey(String),
}

/// Signs an assertion for `credentials` issued at `now`.
pub fn sign(
    credentials: &ValidatedCredentials,
    config: &AssertionConfig,
    now: DateTime<Utc>,
) -> Result<String, SigningError> {
    if config.lifetime_seconds <= 0 || config.lifetime_seconds > MAX_ASSERTION_LIFETIME_SECS {
        return Err(SigningError::InvalidConfig(format!(
            "lifetime must be between 1 and {} seconds, got {}",
            MAX_ASSERTION_LIFETIME_SECS, config.lifetime_seconds
        )));
    }
    if config.scope.trim().is_empty() {
        return Err(SigningError::InvalidConfig("scope is empty".to_string()));
    }
    if config.audience.trim().is_empty() {
        return Err(SigningError::InvalidConfig("audience is empty".to_string()));
    }

    let pem = normalize_pem(credentials.private_key());
    if !pem.contains("BEGIN PRIVATE KEY") || !pem.contains("END PRIVATE KEY") {
        return Err(SigningError::MalformedPem(
            "missing BEGIN/END PRIVATE KEY markers".to_string(),
        ));
    }

    let iat = now.timestamp();
    let claims = AssertionClaims {
        iss: credentials.client_email().to_string(),
        scope: config.scope.clone(),
        aud: config.audience.clone(),
        iat,
        exp: iat + config.lifetime_seconds,
    };

    // jsonwebtoken's error Display never includes key bytes, so it is safe to keep.
    let key = EncodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| SigningError::MalformedPem(e.to_string()))?;

    // Header::new sets typ to "JWT".
    encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| SigningError::InvalidKey(e.to_string()))
}

/// Keys copied into env vars often arrive with literal `\n` sequences.
fn normalize_pem(raw: &str) -> String {
    raw.trim().replace("\\n", "\n")
}
