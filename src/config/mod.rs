//! TOML configuration with an environment override for the spreadsheet id

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Env var that overrides `google_sheets.spreadsheet_id` from the file
pub const SPREADSHEET_ID_ENV: &str = "SELLER_SCOUT_SPREADSHEET_ID";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub google_sheets: GoogleSheets,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleSheets {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file. A missing file is not an error;
    /// it just means defaults (create a new spreadsheet on upload).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(id) = std::env::var(SPREADSHEET_ID_ENV) {
            if !id.is_empty() {
                config.google_sheets.spreadsheet_id = Some(id);
            }
        }

        Ok(config)
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.google_sheets
            .spreadsheet_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spreadsheet_id_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [google_sheets]
            spreadsheet_id = "1AbC"
            "#,
        )
        .unwrap();
        assert_eq!(config.spreadsheet_id(), Some("1AbC"));
    }

    #[test]
    fn empty_toml_means_no_target_spreadsheet() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.spreadsheet_id(), None);
    }

    #[test]
    fn blank_id_counts_as_absent() {
        let config: Config = toml::from_str(
            r#"
            [google_sheets]
            spreadsheet_id = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.spreadsheet_id(), None);
    }
}
