pub mod credential_validator;

pub use credential_validator::{
    validate, validate_json, CredentialError, ServiceAccountCredentials, ValidatedCredentials,
};
