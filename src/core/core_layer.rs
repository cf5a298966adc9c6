// The core module contains all the service-account and spreadsheet logic.
// Nothing in here performs HTTP itself; the infra layer plugs in behind the
// `TokenEndpoint` and `SheetsTransport` traits.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "config/mod.rs"]
pub mod config;

#[path = "credentials/mod.rs"]
pub mod credentials;

#[path = "errors/mod.rs"]
pub mod errors;

#[path = "sheets/mod.rs"]
pub mod sheets;
