// Reads one range from a spreadsheet and prints it as JSON.
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run a single read and report the outcome

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use sheets_bridge::core::auth::SystemClock;
use sheets_bridge::core::config::SheetsConfig;
use sheets_bridge::core::errors::{classify, Failure};
use sheets_bridge::core::sheets::{SheetsOperation, SheetsService};
use sheets_bridge::infra::google::{credentials_loader, ReqwestSheetsTransport, TokenExchanger};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file first so RUST_LOG there applies
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_filter() -> EnvFilter {
    EnvFilter::from_default_env()
}

async fn run() -> anyhow::Result<()> {
    let spreadsheet_id = std::env::var("SHEETS_SPREADSHEET_ID")
        .context("Missing SHEETS_SPREADSHEET_ID environment variable")?;
    let range =
        std::env::var("SHEETS_RANGE").context("Missing SHEETS_RANGE environment variable")?;

    let config = SheetsConfig::from_env();
    let credentials = credentials_loader::from_env()
        .await
        .map_err(|e| classify(Failure::from(e)))?;

    let clock = Arc::new(SystemClock);
    let service = SheetsService::new(
        TokenExchanger::new(clock),
        ReqwestSheetsTransport::new(),
        config,
    );

    let operation = SheetsOperation::Read {
        spreadsheet_id,
        range,
    };
    tracing::info!("Reading {}", operation.name());

    let values = service.execute(&credentials, &operation).await?;
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_from_env_file_reaches_the_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=sheets_bridge=debug\n").unwrap();

        std::env::remove_var("RUST_LOG");
        dotenv::from_path(&path).unwrap();

        assert_eq!(log_filter().to_string(), "sheets_bridge=debug");
    }
}
