// Shared fixtures for unit tests. The keys under testdata/ exist only for
// tests and are not registered with any Google project.

pub const TEST_CLIENT_EMAIL: &str = "sheets-bot@test-project.iam.gserviceaccount.com";

/// RSA 2048 private key in PKCS#8 PEM form.
pub const TEST_PRIVATE_KEY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/service_account_key.pem"
));

/// Public half of `TEST_PRIVATE_KEY`, for verifying signatures.
pub const TEST_PUBLIC_KEY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/service_account_key.pub.pem"
));

/// P-256 key in PKCS#8 PEM form. Has valid markers but is not RSA.
pub const TEST_EC_KEY: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/testdata/ec_key.pem"
));
