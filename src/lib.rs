// Service-account authentication and request plumbing for the Google Sheets
// values API.
//
// **Architecture Overview:**
// - `core/` = Credentials, assertion signing, token caching, request building,
//   error classification and the service that ties them together
// - `infra/` = reqwest-backed implementations of the core traits

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;

#[cfg(test)]
mod test_support;
