// Small reqwest helpers shared by the token exchanger and the sheets transport.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::core::errors::TransportError;

/// Maps a reqwest failure to a transport error. The URL is dropped from the
/// message; only the host survives for connect errors.
pub fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::TimedOut;
    }
    if err.is_connect() {
        let host = err
            .url()
            .and_then(|url| url.host_str())
            .unwrap_or("remote host")
            .to_string();
        return TransportError::Connect { host };
    }
    TransportError::Request(err.without_url().to_string())
}

/// `Retry-After: <seconds>`. The HTTP-date form is ignored.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
