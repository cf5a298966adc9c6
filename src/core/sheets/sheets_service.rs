// =============================================================================
// SHEETS SERVICE
// =============================================================================
//
// The single entry point callers use: hand it credentials and an operation,
// get back the API's JSON payload or a `ClassifiedError`.
//
// **Order of work for one request:**
// 1. Validate the operation and the credentials (no I/O, fail fast)
// 2. Get a token from the cache; on a miss, sign an assertion and exchange it
// 3. Build the request
// 4. Send it and interpret the status
//
// Steps 2 and 4 are the only suspension points, and each one runs under the
// request deadline. Transient failures (network, 429, 5xx) go through the
// retry policy; everything else is returned as-is on the first failure.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::core::auth::{
    sign, AssertionConfig, CachedToken, Clock, SystemClock, TokenCache, TokenEndpoint,
    TokenExchangeError, DEFAULT_SAFETY_MARGIN_SECS, DEFAULT_TOKEN_URI,
    MAX_ASSERTION_LIFETIME_SECS,
};
use crate::core::config::SheetsConfig;
use crate::core::credentials::{validate, ServiceAccountCredentials, ValidatedCredentials};
use crate::core::errors::{
    classify, parse_remote_body, ClassifiedError, ErrorKind, Failure, HttpFailure,
    TransportError,
};
use crate::core::sheets::{RetryPolicy, SheetsOperation, SheetsRequestBuilder, SheetsTransport};

pub struct SheetsService<E, T> {
    endpoint: Arc<E>,
    transport: T,
    cache: TokenCache,
    builder: SheetsRequestBuilder,
    clock: Arc<dyn Clock>,
    scope: String,
    token_uri: Option<String>,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl<E, T> SheetsService<E, T>
where
    E: TokenEndpoint + 'static,
    T: SheetsTransport,
{
    pub fn new(endpoint: E, transport: T, config: SheetsConfig) -> Self {
        Self::with_clock(endpoint, transport, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        endpoint: E,
        transport: T,
        config: SheetsConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let margin = chrono::Duration::from_std(config.token_safety_margin)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS));

        Self {
            endpoint: Arc::new(endpoint),
            transport,
            cache: TokenCache::new(Arc::clone(&clock), margin),
            builder: SheetsRequestBuilder::new(config.base_url),
            clock,
            scope: config.scope,
            token_uri: config.token_uri,
            request_timeout: config.request_timeout,
            retry: config.retry,
        }
    }

    pub fn token_cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Runs `operation` with the configured deadline.
    pub async fn execute(
        &self,
        credentials: &ServiceAccountCredentials,
        operation: &SheetsOperation,
    ) -> Result<Value, ClassifiedError> {
        self.execute_with_timeout(credentials, operation, self.request_timeout)
            .await
    }

    /// Runs `operation`, giving each network call at most `timeout`.
    pub async fn execute_with_timeout(
        &self,
        credentials: &ServiceAccountCredentials,
        operation: &SheetsOperation,
        timeout: Duration,
    ) -> Result<Value, ClassifiedError> {
        operation
            .validate()
            .map_err(|reason| classify(Failure::InvalidOperation(reason)))?;
        let credentials = validate(Some(credentials)).map_err(|e| classify(e.into()))?;

        let mut attempt = 1;
        loop {
            match self.attempt(&credentials, operation, timeout).await {
                Ok(payload) => return Ok(payload),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt, err.retry_after);
                    tracing::warn!(
                        attempt,
                        kind = %err.kind,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying spreadsheet {}: {}",
                        operation.name(),
                        err.message
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(
        &self,
        credentials: &ValidatedCredentials,
        operation: &SheetsOperation,
        timeout: Duration,
    ) -> Result<Value, ClassifiedError> {
        let token = self.current_token(credentials, timeout).await?;
        let request = self.builder.build(operation, &token);

        tracing::debug!(
            method = request.method.as_str(),
            spreadsheet_id = operation.spreadsheet_id(),
            "Sending spreadsheet {} request",
            operation.name()
        );

        let response = match tokio::time::timeout(timeout, self.transport.send(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(classify(err.into())),
            Err(_) => return Err(classify(TransportError::TimedOut.into())),
        };

        if !response.is_success() {
            let err = classify(Failure::Http(HttpFailure {
                status: response.status,
                body: parse_remote_body(&response.body),
                retry_after: response.retry_after,
            }));
            if err.kind == ErrorKind::AuthorizationFailure {
                // The token may have been revoked; do not hand it out again.
                self.cache.invalidate_if_current(&token).await;
            }
            return Err(err);
        }

        decode_success_body(&response.body)
    }

    async fn current_token(
        &self,
        credentials: &ValidatedCredentials,
        timeout: Duration,
    ) -> Result<CachedToken, ClassifiedError> {
        let audience = self
            .token_uri
            .clone()
            .or_else(|| credentials.token_uri().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
        let config = AssertionConfig {
            scope: self.scope.clone(),
            audience,
            lifetime_seconds: MAX_ASSERTION_LIFETIME_SECS,
        };

        let endpoint = Arc::clone(&self.endpoint);
        let clock = Arc::clone(&self.clock);
        let signer_credentials = credentials.clone();
        let refresh =
            move || refresh_token(endpoint, clock, signer_credentials, config, timeout);

        match tokio::time::timeout(
            timeout,
            self.cache.get_token(credentials.client_email(), refresh),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(classify(
                TokenExchangeError::Transport(TransportError::TimedOut).into(),
            )),
        }
    }
}

/// Signs a fresh assertion and trades it for a token. Runs on the cache's
/// refresh task, so everything it needs is owned.
async fn refresh_token<E: TokenEndpoint>(
    endpoint: Arc<E>,
    clock: Arc<dyn Clock>,
    credentials: ValidatedCredentials,
    config: AssertionConfig,
    timeout: Duration,
) -> Result<CachedToken, ClassifiedError> {
    let assertion =
        sign(&credentials, &config, clock.now()).map_err(|e| classify(e.into()))?;

    match tokio::time::timeout(timeout, endpoint.exchange(&assertion, &config.audience)).await {
        Ok(result) => result.map_err(|e| classify(e.into())),
        Err(_) => Err(classify(
            TokenExchangeError::Transport(TransportError::TimedOut).into(),
        )),
    }
}

fn decode_success_body(body: &str) -> Result<Value, ClassifiedError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(body).map_err(|e| classify(Failure::Decode(e.to_string())))
}
