// Service account authentication: assertion signing, the token endpoint port,
// and the process-wide token cache.

pub mod assertion_signer;
pub mod clock;
pub mod token_cache;
pub mod token_endpoint;

pub use assertion_signer::{
    sign, AssertionClaims, AssertionConfig, SigningError, DEFAULT_TOKEN_URI,
    MAX_ASSERTION_LIFETIME_SECS, SPREADSHEETS_SCOPE,
};
#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use token_cache::{CachedToken, TokenCache, DEFAULT_SAFETY_MARGIN_SECS};
pub use token_endpoint::{TokenEndpoint, TokenExchangeError};
