// This module checks that a service-account credential has the fields we need
// before anything cryptographic happens. It never parses the key itself; a
// malformed key is the signer's problem and gets reported as a signing failure.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// MODELS
// ============================================================================

/// Service account credentials as they appear in a downloaded JSON key file.
///
/// Every field is optional at this level so that a partially filled key file
/// still deserializes and the validator can say exactly what is missing.
#[derive(Clone, Default, Deserialize)]
pub struct ServiceAccountCredentials {
    /// The service account email (used as issuer in the assertion).
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_email: Option<String>,

    /// The private key in PEM format (PKCS#8).
    #[serde(default, deserialize_with = "lenient_string")]
    pub private_key: Option<String>,

    /// Token endpoint advertised by the key file, if any.
    #[serde(default, deserialize_with = "lenient_string")]
    pub token_uri: Option<String>,
}

// Keep the key out of logs and panic messages.
impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountCredentials {
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: Some(client_email.into()),
            private_key: Some(private_key.into()),
            token_uri: None,
        }
    }

    /// Shape-checks an untyped JSON value. `null` and non-objects are rejected;
    /// fields with the wrong JSON type are treated as absent.
    pub fn from_json_value(value: &Value) -> Result<Self, CredentialError> {
        match value {
            Value::Null => Err(CredentialError::Missing),
            Value::Object(_) => Self::deserialize(value)
                .map_err(|e| CredentialError::Malformed(e.to_string())),
            _ => Err(CredentialError::Malformed(
                "credentials must be a JSON object".to_string(),
            )),
        }
    }

    /// Parses key-file text. Syntax errors are reported without echoing the input.
    pub fn from_json_str(json: &str) -> Result<Self, CredentialError> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            CredentialError::Malformed(format!(
                "credentials are not valid JSON (line {}, column {})",
                e.line(),
                e.column()
            ))
        })?;
        Self::from_json_value(&value)
    }
}

/// Credentials that passed [`validate`]. Fields are exactly what the caller
/// supplied; the only guarantee is that both are present and non-blank.
#[derive(Clone)]
pub struct ValidatedCredentials {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

impl ValidatedCredentials {
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn token_uri(&self) -> Option<&str> {
        self.token_uri.as_deref()
    }
}

impl std::fmt::Debug for ValidatedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No service account credentials were provided")]
    Missing,

    #[error("Service account credentials are missing a non-empty '{0}'")]
    MissingField(&'static str),

    #[error("Service account credentials are malformed: {0}")]
    Malformed(String),
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Checks that `client_email` and `private_key` are present and not blank.
///
/// Each field is checked on its own, so a blank email is reported even when
/// the key is perfect (and vice versa).
pub fn validate(
    credentials: Option<&ServiceAccountCredentials>,
) -> Result<ValidatedCredentials, CredentialError> {
    let credentials = credentials.ok_or(CredentialError::Missing)?;

    let client_email = non_blank(credentials.client_email.as_deref())
        .ok_or(CredentialError::MissingField("client_email"))?;
    let private_key = non_blank(credentials.private_key.as_deref())
        .ok_or(CredentialError::MissingField("private_key"))?;

    Ok(ValidatedCredentials {
        client_email: client_email.to_string(),
        private_key: private_key.to_string(),
        token_uri: credentials.token_uri.clone(),
    })
}

/// Convenience for untyped input: shape-check, then validate.
pub fn validate_json(value: &Value) -> Result<ValidatedCredentials, CredentialError> {
    let credentials = ServiceAccountCredentials::from_json_value(value)?;
    validate(Some(&credentials))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_fields_without_transforming_them() {
        let creds = ServiceAccountCredentials::new("  bot@example.iam.gserviceaccount.com", "key ");
        let validated = validate(Some(&creds)).unwrap();

        assert_eq!(validated.client_email(), "  bot@example.iam.gserviceaccount.com");
        assert_eq!(validated.private_key(), "key ");
    }

    #[test]
    fn accepts_any_non_blank_content() {
        // No crypto parsing happens here.
        let creds = ServiceAccountCredentials::new("not-an-email", "not a pem");
        assert!(validate(Some(&creds)).is_ok());
    }

    #[test]
    fn rejects_absent_input() {
        assert_eq!(validate(None).unwrap_err(), CredentialError::Missing);
    }

    #[test]
    fn rejects_blank_or_missing_email() {
        for email in [None, Some(""), Some("   "), Some("\t\n")] {
            let creds = ServiceAccountCredentials {
                client_email: email.map(str::to_string),
                private_key: Some("key".to_string()),
                token_uri: None,
            };
            assert_eq!(
                validate(Some(&creds)).unwrap_err(),
                CredentialError::MissingField("client_email")
            );
        }
    }

    #[test]
    fn rejects_blank_or_missing_private_key() {
        for key in [None, Some(""), Some("  ")] {
            let creds = ServiceAccountCredentials {
                client_email: Some("bot@example.com".to_string()),
                private_key: key.map(str::to_string),
                token_uri: None,
            };
            assert_eq!(
                validate(Some(&creds)).unwrap_err(),
                CredentialError::MissingField("private_key")
            );
        }
    }

    #[test]
    fn json_shape_check_handles_untyped_input() {
        assert_eq!(validate_json(&Value::Null).unwrap_err(), CredentialError::Missing);
        assert!(matches!(
            validate_json(&json!("a string")).unwrap_err(),
            CredentialError::Malformed(_)
        ));
        assert_eq!(
            validate_json(&json!({ "client_email": 42, "private_key": "k" })).unwrap_err(),
            CredentialError::MissingField("client_email")
        );

        let ok = validate_json(&json!({
            "type": "service_account",
            "client_email": "bot@example.com",
            "private_key": "k",
            "token_uri": "https://oauth2.googleapis.com/token"
        }))
        .unwrap();
        assert_eq!(ok.token_uri(), Some("https://oauth2.googleapis.com/token"));
    }

    #[test]
    fn invalid_json_text_is_malformed_without_echoing_input() {
        let err = ServiceAccountCredentials::from_json_str("{\"private_key\": \"SECRET").unwrap_err();
        assert!(matches!(err, CredentialError::Malformed(_)));
        assert!(!err.to_string().contains("SECRET"));
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let creds = ServiceAccountCredentials::new("bot@example.com", "SUPER-SECRET");
        assert!(!format!("{:?}", creds).contains("SUPER-SECRET"));
        let validated = validate(Some(&creds)).unwrap();
        assert!(!format!("{:?}", validated).contains("SUPER-SECRET"));
    }
}
