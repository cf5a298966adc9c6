// =============================================================================
// TOKEN EXCHANGER
// =============================================================================
//
// Trades a signed assertion for an access token at Google's OAuth2 endpoint.
//
//   POST <token_uri>
//   Content-Type: application/x-www-form-urlencoded
//   grant_type=urn:ietf:params:oauth:grant-type:jwt-bearer&assertion=<jwt>
//
// A successful body looks like:
//   {"access_token": "...", "expires_in": 3599, "token_type": "Bearer"}
//
// Anything else (non-2xx, not JSON, missing fields, zero lifetime, some other
// token type) is an error. The result is not stored here; the token cache owns
// that.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::auth::{CachedToken, Clock, TokenEndpoint, TokenExchangeError};
use crate::core::errors::parse_remote_body;
use crate::infra::google::http_support::{retry_after, transport_error};

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The three fields we need from the token endpoint, after shape checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

pub struct TokenExchanger {
    client: Client,
    clock: Arc<dyn Clock>,
}

impl TokenExchanger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_client(Client::new(), clock)
    }

    pub fn with_client(client: Client, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }
}

#[async_trait]
impl TokenEndpoint for TokenExchanger {
    async fn exchange(
        &self,
        assertion: &str,
        token_endpoint: &str,
    ) -> Result<CachedToken, TokenExchangeError> {
        tracing::debug!("Exchanging assertion at {}", token_endpoint);

        let response = self
            .client
            .post(token_endpoint)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await
            .map_err(|e| TokenExchangeError::Transport(transport_error(e)))?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response
            .text()
            .await
            .map_err(|e| TokenExchangeError::Transport(transport_error(e)))?;

        if !status.is_success() {
            return Err(TokenExchangeError::Rejected {
                status: status.as_u16(),
                body: parse_remote_body(&text),
                retry_after,
            });
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            TokenExchangeError::InvalidResponse {
                status: Some(status.as_u16()),
                reason: format!("body is not JSON ({})", e),
                body: None,
            }
        })?;

        let parsed = parse_token_response(&body).map_err(|reason| {
            TokenExchangeError::InvalidResponse {
                status: Some(status.as_u16()),
                reason,
                body: Some(redact_access_token(body.clone())),
            }
        })?;

        Ok(CachedToken {
            access_token: parsed.access_token,
            token_type: parsed.token_type,
            expires_in: parsed.expires_in,
            acquired_at: self.clock.now(),
        })
    }
}

/// Shape-checks a token endpoint body. Returns the reason on failure.
pub fn parse_token_response(body: &Value) -> Result<TokenResponse, String> {
    let object = body
        .as_object()
        .ok_or_else(|| "body is not a JSON object".to_string())?;

    let access_token = object
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| "access_token must be a non-empty string".to_string())?;

    let expires_in = object
        .get("expires_in")
        .and_then(Value::as_u64)
        .filter(|secs| *secs > 0)
        .ok_or_else(|| "expires_in must be a positive integer".to_string())?;

    let token_type = object
        .get("token_type")
        .and_then(Value::as_str)
        .ok_or_else(|| "token_type is missing".to_string())?;
    if token_type != "Bearer" {
        return Err(format!("token_type must be Bearer, got {:?}", token_type));
    }

    Ok(TokenResponse {
        access_token: access_token.to_string(),
        expires_in,
        token_type: token_type.to_string(),
    })
}

// A body that failed validation may still carry a real token.
fn redact_access_token(mut body: Value) -> Value {
    if let Some(token) = body.get_mut("access_token") {
        *token = Value::String("<redacted>".to_string());
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::ManualClock;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ))
    }

    async fn exchange_against(response: ResponseTemplate) -> Result<CachedToken, TokenExchangeError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(response)
            .mount(&server)
            .await;

        TokenExchanger::new(clock())
            .exchange("a.b.c", &format!("{}/token", server.uri()))
            .await
    }

    #[test]
    fn accepts_complete_response() {
        let parsed = parse_token_response(&json!({
            "access_token": "ya29.abc",
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .unwrap();

        assert_eq!(
            parsed,
            TokenResponse {
                access_token: "ya29.abc".to_string(),
                expires_in: 3599,
                token_type: "Bearer".to_string(),
            }
        );
    }

    #[test]
    fn rejects_incomplete_or_wrong_responses() {
        let cases = [
            json!(null),
            json!("token"),
            json!([]),
            json!({"expires_in": 3599, "token_type": "Bearer"}),
            json!({"access_token": "", "expires_in": 3599, "token_type": "Bearer"}),
            json!({"access_token": 5, "expires_in": 3599, "token_type": "Bearer"}),
            json!({"access_token": "t", "expires_in": 0, "token_type": "Bearer"}),
            json!({"access_token": "t", "expires_in": -10, "token_type": "Bearer"}),
            json!({"access_token": "t", "expires_in": "3599", "token_type": "Bearer"}),
            json!({"access_token": "t", "expires_in": 3599, "token_type": "bearer"}),
            json!({"access_token": "t", "expires_in": 3599, "token_type": "MAC"}),
            json!({"access_token": "t", "expires_in": 3599}),
        ];

        for case in cases {
            assert!(parse_token_response(&case).is_err(), "accepted {}", case);
        }
    }

    #[tokio::test]
    async fn posts_jwt_bearer_form_and_round_trips_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion=header.claims.signature"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let clock = clock();
        let token = TokenExchanger::new(clock.clone())
            .exchange("header.claims.signature", &format!("{}/token", server.uri()))
            .await
            .unwrap();

        assert_eq!(token.access_token, "ya29.fresh");
        assert_eq!(token.expires_in, 3599);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.acquired_at, clock.now());
    }

    #[tokio::test]
    async fn error_status_keeps_status_and_body() {
        let err = exchange_against(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid JWT Signature."
        })))
        .await
        .unwrap_err();

        assert_eq!(
            err,
            TokenExchangeError::Rejected {
                status: 400,
                body: Some(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid JWT Signature."
                })),
                retry_after: None,
            }
        );
    }

    #[tokio::test]
    async fn unparsable_success_body_is_invalid() {
        let err = exchange_against(ResponseTemplate::new(200).set_body_string("<html>"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TokenExchangeError::InvalidResponse { status: Some(200), .. }
        ));
    }

    #[tokio::test]
    async fn wrong_token_type_is_invalid_and_redacted() {
        let err = exchange_against(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.leaky",
            "expires_in": 3599,
            "token_type": "MAC"
        })))
        .await
        .unwrap_err();

        match err {
            TokenExchangeError::InvalidResponse { reason, body, .. } => {
                assert!(reason.contains("Bearer"));
                assert!(!body.unwrap().to_string().contains("ya29.leaky"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Nothing listens on port 9 locally.
        let err = TokenExchanger::new(clock())
            .exchange("a.b.c", "http://127.0.0.1:9/token")
            .await
            .unwrap_err();

        assert!(matches!(err, TokenExchangeError::Transport(_)));
    }
}
