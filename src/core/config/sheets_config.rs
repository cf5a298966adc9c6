// Runtime settings for the spreadsheet service. Everything has a default so a
// bare `.env` with just the key file path works.
//
// **Environment Variables:**
// - `GOOGLE_SHEETS_BASE_URL` - Values API root (default: https://sheets.googleapis.com/v4)
// - `GOOGLE_SHEETS_SCOPE` - OAuth scope (default: spreadsheets read/write)
// - `GOOGLE_TOKEN_URI` - Token endpoint override (default: key file's token_uri)
// - `SHEETS_REQUEST_TIMEOUT_SECS` - Deadline per network call (default: 30)
// - `SHEETS_TOKEN_SAFETY_MARGIN_SECS` - Refresh this long before expiry (default: 60)
// - `SHEETS_MAX_ATTEMPTS` / `SHEETS_RETRY_BASE_MS` / `SHEETS_RETRY_MAX_MS` - Backoff

use std::str::FromStr;
use std::time::Duration;

use crate::core::auth::{DEFAULT_SAFETY_MARGIN_SECS, SPREADSHEETS_SCOPE};
use crate::core::sheets::{RetryPolicy, DEFAULT_SHEETS_BASE_URL};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub base_url: String,
    pub scope: String,
    /// When unset, the credential's own `token_uri` (or Google's default) is used.
    pub token_uri: Option<String>,
    pub request_timeout: Duration,
    pub token_safety_margin: Duration,
    pub retry: RetryPolicy,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            scope: SPREADSHEETS_SCOPE.to_string(),
            token_uri: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_safety_margin: Duration::from_secs(DEFAULT_SAFETY_MARGIN_SECS as u64),
            retry: RetryPolicy::default(),
        }
    }
}

impl SheetsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            base_url: get("GOOGLE_SHEETS_BASE_URL").unwrap_or(defaults.base_url),
            scope: get("GOOGLE_SHEETS_SCOPE").unwrap_or(defaults.scope),
            token_uri: get("GOOGLE_TOKEN_URI"),
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "SHEETS_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            token_safety_margin: Duration::from_secs(parse_or(
                &get,
                "SHEETS_TOKEN_SAFETY_MARGIN_SECS",
                defaults.token_safety_margin.as_secs(),
            )),
            retry: RetryPolicy {
                max_attempts: parse_or(&get, "SHEETS_MAX_ATTEMPTS", defaults.retry.max_attempts)
                    .max(1),
                base_delay: Duration::from_millis(parse_or(
                    &get,
                    "SHEETS_RETRY_BASE_MS",
                    defaults.retry.base_delay.as_millis() as u64,
                )),
                max_delay: Duration::from_millis(parse_or(
                    &get,
                    "SHEETS_RETRY_MAX_MS",
                    defaults.retry.max_delay.as_millis() as u64,
                )),
            },
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
    }
}
