//! Publishing strategy chain: delegated `gog` CLI first, direct API second.
//!
//! Each strategy is tried at most once, in order; the first success wins and
//! the last failure surfaces when every strategy fails. This is a fallback
//! chain, not a retry policy.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::SheetTarget;
use crate::sheets::{self, SheetsClient};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("CSV file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("CSV file is empty")]
    EmptyInput,
    #[error(
        "Google credentials not found. Set GOOGLE_APPLICATION_CREDENTIALS \
         or place credentials.json in a default location"
    )]
    CredentialsNotFound,
    #[error("gog tool not found in PATH")]
    ToolMissing,
    #[error("gog sheets integration pending, use the direct API instead")]
    NotImplemented,
    #[error("{0}")]
    Token(String),
    #[error("Unexpected API response: {0}")]
    Response(String),
    #[error("Sheets API returned {status}: {message}")]
    Api { status: String, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One way of getting rows into a spreadsheet
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Display name for log lines
    fn name(&self) -> &'static str;

    /// Attempt the publish once; returns the spreadsheet view URL.
    async fn publish(
        &self,
        rows: &[Vec<String>],
        target: &SheetTarget,
    ) -> Result<String, PublishError>;
}

/// Delegation to the external `gog` executable.
///
/// The subcommand shape is `gog sheets upload <name> [--spreadsheet-id <id>]`,
/// but the integration is not wired up yet; this strategy exists to trigger
/// the fallthrough to the direct API.
pub struct GogCli;

#[async_trait]
impl Publisher for GogCli {
    fn name(&self) -> &'static str {
        "gog"
    }

    async fn publish(
        &self,
        _rows: &[Vec<String>],
        target: &SheetTarget,
    ) -> Result<String, PublishError> {
        let Some(tool) = find_in_path("gog") else {
            return Err(PublishError::ToolMissing);
        };

        let mut args = vec!["sheets".to_string(), "upload".to_string(), target.sheet_name.clone()];
        if let Some(id) = &target.spreadsheet_id {
            args.push("--spreadsheet-id".to_string());
            args.push(id.clone());
        }

        // TODO: invoke the tool once gog's sheets subcommand interface stabilizes
        let _ = (tool, args);
        Err(PublishError::NotImplemented)
    }
}

/// Direct Google Sheets API path
pub struct SheetsApi;

#[async_trait]
impl Publisher for SheetsApi {
    fn name(&self) -> &'static str {
        "sheets-api"
    }

    async fn publish(
        &self,
        rows: &[Vec<String>],
        target: &SheetTarget,
    ) -> Result<String, PublishError> {
        let creds_path =
            sheets::resolve_credentials_path().ok_or(PublishError::CredentialsNotFound)?;
        let client = SheetsClient::authenticate(&creds_path).await?;
        client.upload(rows, target).await
    }
}

/// Read a CSV file and publish it under `sheet_name`, targeting the
/// spreadsheet configured in `config` (or a new one if none is set).
pub async fn upload_csv(
    csv_path: &Path,
    sheet_name: &str,
    config: &Config,
) -> Result<String, PublishError> {
    if !csv_path.exists() {
        return Err(PublishError::FileNotFound(csv_path.to_path_buf()));
    }

    let rows = read_rows(csv_path)?;
    let target = SheetTarget {
        spreadsheet_id: config.spreadsheet_id().map(str::to_string),
        sheet_name: sheet_name.to_string(),
    };

    publish_rows(&rows, &target).await
}

/// Run the strategy chain over already-loaded rows.
pub async fn publish_rows(
    rows: &[Vec<String>],
    target: &SheetTarget,
) -> Result<String, PublishError> {
    // Empty input is rejected before any strategy (and thus any network call).
    if rows.is_empty() {
        return Err(PublishError::EmptyInput);
    }

    let strategies: Vec<Box<dyn Publisher>> = vec![Box::new(GogCli), Box::new(SheetsApi)];
    let mut last_error = None;

    for strategy in &strategies {
        match strategy.publish(rows, target).await {
            Ok(url) => {
                info!("Published via {}: {}", strategy.name(), url);
                return Ok(url);
            }
            Err(e) => {
                warn!("{} publisher failed: {}", strategy.name(), e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.expect("strategy list is non-empty"))
}

/// Header row plus data rows, no schema validation beyond non-empty.
fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, PublishError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    if rows.is_empty() {
        return Err(PublishError::EmptyInput);
    }
    Ok(rows)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn target() -> SheetTarget {
        SheetTarget {
            spreadsheet_id: None,
            sheet_name: "Suppliers".to_string(),
        }
    }

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("seller-scout-{name}-{}", std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn empty_rows_fail_before_any_strategy_runs() {
        let err = publish_rows(&[], &target()).await.unwrap_err();
        assert!(matches!(err, PublishError::EmptyInput));
    }

    #[tokio::test]
    async fn missing_csv_file_is_rejected_up_front() {
        let err = upload_csv(Path::new("/nonexistent/products.csv"), "Suppliers", &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn empty_csv_file_is_rejected_before_publishing() {
        let path = scratch_file("empty.csv", "");
        let err = upload_csv(&path, "Suppliers", &Config::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::EmptyInput));
    }

    #[tokio::test]
    async fn gog_strategy_never_succeeds() {
        // Either the tool is absent or the integration is pending; both
        // outcomes must fall through to the next strategy.
        let rows = vec![vec!["name".to_string()]];
        let err = GogCli.publish(&rows, &target()).await.unwrap_err();
        assert!(matches!(
            err,
            PublishError::ToolMissing | PublishError::NotImplemented
        ));
    }

    #[test]
    fn csv_rows_keep_header_and_order() {
        let path = scratch_file(
            "rows.csv",
            "name,price\nWidget,9.99\nGadget,12.50\n",
        );
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["name", "price"]);
        assert_eq!(rows[2], vec!["Gadget", "12.50"]);
    }
}
