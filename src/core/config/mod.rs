pub mod sheets_config;

pub use sheets_config::{SheetsConfig, DEFAULT_REQUEST_TIMEOUT_SECS};
