//! Direct Google Sheets API client, authenticated with a service account.
//!
//! Credentials are resolved from a fixed search order, exchanged for a
//! bearer token via an RS256-signed JWT assertion, and then used for plain
//! REST calls. Each call is made at most once; there is no retry tier here.

use std::path::{Path, PathBuf};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::models::{SheetTarget, Spreadsheet, ValueRange};
use crate::publish::PublishError;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Env var naming the service-account key file; overrides the search paths
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Sheet title used when creating a brand-new spreadsheet
pub const DEFAULT_SHEET_TITLE: &str = "Products";

/// Rectangle wiped before every write
const CLEAR_RANGE: &str = "A1:ZZ";

/// Service-account key file fields we need for the token exchange
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Locate a service-account key file: the env var wins outright (even when
/// the file it names is missing), otherwise the first existing candidate.
pub fn resolve_credentials_path() -> Option<PathBuf> {
    resolve_from(
        std::env::var_os(CREDENTIALS_ENV).map(PathBuf::from),
        candidate_paths(),
    )
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        paths.push(home.join(".config/gog/credentials.json"));
        paths.push(home.join(".openclaw/gog/credentials.json"));
    }
    paths.push(PathBuf::from("credentials.json"));
    paths
}

fn resolve_from(env_override: Option<PathBuf>, candidates: Vec<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = env_override {
        return path.exists().then_some(path);
    }
    candidates.into_iter().find(|path| path.exists())
}

/// One API call in a sheet write; executed strictly in plan order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateStep {
    AddSheet,
    ClearValues,
    WriteValues,
    FormatHeader,
}

/// Steps for a sheet that is known to exist
const WRITE_STEPS: [UpdateStep; 3] = [
    UpdateStep::ClearValues,
    UpdateStep::WriteValues,
    UpdateStep::FormatHeader,
];

/// A missing sheet must be added before anything is cleared or written.
fn plan_update(spreadsheet: &Spreadsheet, sheet_name: &str) -> Vec<UpdateStep> {
    let mut steps = Vec::new();
    if !spreadsheet.has_sheet(sheet_name) {
        steps.push(UpdateStep::AddSheet);
    }
    steps.extend(WRITE_STEPS);
    steps
}

/// Authenticated Sheets API client
pub struct SheetsClient {
    client: Client,
    token: String,
}

impl SheetsClient {
    /// Read a service-account key file and exchange it for an access token.
    pub async fn authenticate(creds_path: &Path) -> Result<Self, PublishError> {
        let raw = std::fs::read_to_string(creds_path).map_err(|e| {
            PublishError::Token(format!("Failed to read {}: {e}", creds_path.display()))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            PublishError::Token(format!("Malformed service-account key file: {e}"))
        })?;

        let client = Client::new();
        let token = fetch_access_token(&client, &key).await?;

        info!("Authenticated to Google Sheets as {}", key.client_email);
        Ok(Self { client, token })
    }

    /// Publish rows to the target: create a fresh spreadsheet when no id is
    /// configured, otherwise update (and if needed add) the named sheet.
    /// Returns the spreadsheet's canonical view URL.
    pub async fn upload(
        &self,
        rows: &[Vec<String>],
        target: &SheetTarget,
    ) -> Result<String, PublishError> {
        match target.spreadsheet_id.as_deref() {
            None => {
                let created = self.create_spreadsheet(&target.sheet_name).await?;
                self.run_steps(&created.spreadsheet_id, DEFAULT_SHEET_TITLE, rows, &WRITE_STEPS)
                    .await?;
                Ok(created
                    .spreadsheet_url
                    .unwrap_or_else(|| view_url(&created.spreadsheet_id)))
            }
            Some(id) => {
                let spreadsheet = self.get_spreadsheet(id).await?;
                let plan = plan_update(&spreadsheet, &target.sheet_name);
                self.run_steps(id, &target.sheet_name, rows, &plan).await?;
                Ok(view_url(id))
            }
        }
    }

    /// Execute planned steps in order, one API call each.
    async fn run_steps(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<String>],
        steps: &[UpdateStep],
    ) -> Result<(), PublishError> {
        for step in steps {
            match step {
                UpdateStep::AddSheet => self.add_sheet(spreadsheet_id, sheet_name).await?,
                UpdateStep::ClearValues => self.clear_values(spreadsheet_id, sheet_name).await?,
                UpdateStep::WriteValues => {
                    self.write_values(spreadsheet_id, sheet_name, rows).await?;
                }
                UpdateStep::FormatHeader => {
                    let sheet_id = self
                        .get_spreadsheet(spreadsheet_id)
                        .await?
                        .sheet_id(sheet_name);
                    self.format_header_row(spreadsheet_id, sheet_id).await?;
                }
            }
        }

        info!("Wrote {} rows to sheet '{}'", rows.len(), sheet_name);
        Ok(())
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<Spreadsheet, PublishError> {
        let body = json!({
            "properties": { "title": title },
            "sheets": [ { "properties": { "title": DEFAULT_SHEET_TITLE } } ],
        });
        let url = format!("{SHEETS_API}?fields=spreadsheetId,spreadsheetUrl");
        let response = self.api_post(&url, &body).await?;
        serde_json::from_value(response).map_err(|e| PublishError::Response(e.to_string()))
    }

    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet, PublishError> {
        let url = format!("{SHEETS_API}/{spreadsheet_id}");
        let response = self.client.get(&url).bearer_auth(&self.token).send().await?;
        let value = check_response(response).await?;
        serde_json::from_value(value).map_err(|e| PublishError::Response(e.to_string()))
    }

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<(), PublishError> {
        let url = format!("{SHEETS_API}/{spreadsheet_id}:batchUpdate");
        let body = json!({
            "requests": [ { "addSheet": { "properties": { "title": title } } } ],
        });
        self.api_post(&url, &body).await?;
        info!("Created sheet '{}'", title);
        Ok(())
    }

    async fn clear_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<(), PublishError> {
        let url = format!(
            "{}:clear",
            values_url(spreadsheet_id, &format!("{sheet_name}!{CLEAR_RANGE}"))
        );
        self.api_post(&url, &json!({})).await?;
        Ok(())
    }

    async fn write_values(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<String>],
    ) -> Result<(), PublishError> {
        let url = format!(
            "{}?valueInputOption=RAW",
            values_url(spreadsheet_id, &format!("{sheet_name}!A1"))
        );
        let body = ValueRange {
            values: rows.to_vec(),
        };
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_response(response).await?;
        Ok(())
    }

    async fn format_header_row(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
    ) -> Result<(), PublishError> {
        let url = format!("{SHEETS_API}/{spreadsheet_id}:batchUpdate");
        let body = json!({ "requests": [ header_format_request(sheet_id) ] });
        self.api_post(&url, &body).await?;
        Ok(())
    }

    async fn api_post(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, PublishError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        check_response(response).await
    }
}

impl Clone for SheetsClient {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            token: self.token.clone(),
        }
    }
}

async fn check_response(response: reqwest::Response) -> Result<serde_json::Value, PublishError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PublishError::Api {
            status: status.to_string(),
            message,
        });
    }
    Ok(response.json().await?)
}

async fn fetch_access_token(
    client: &Client,
    key: &ServiceAccountKey,
) -> Result<String, PublishError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SHEETS_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| PublishError::Token(format!("Invalid service-account private key: {e}")))?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| PublishError::Token(format!("Failed to sign token assertion: {e}")))?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PublishError::Token(format!(
            "Token endpoint returned {status}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| PublishError::Token(format!("Malformed token response: {e}")))?;
    Ok(token.access_token)
}

/// Bold white-on-blue formatting applied to the header row only
fn header_format_request(sheet_id: i64) -> serde_json::Value {
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 0,
                "endRowIndex": 1,
            },
            "cell": {
                "userEnteredFormat": {
                    "backgroundColor": { "red": 0.2, "green": 0.6, "blue": 0.9 },
                    "textFormat": {
                        "bold": true,
                        "foregroundColor": { "red": 1.0, "green": 1.0, "blue": 1.0 },
                    },
                },
            },
            "fields": "userEnteredFormat(backgroundColor,textFormat)",
        },
    })
}

fn view_url(spreadsheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{spreadsheet_id}")
}

/// A1-notation ranges carry the sheet title, which may hold `#`, `?`, or
/// spaces; the range must travel as one percent-encoded path segment or the
/// request silently targets the wrong resource.
fn values_url(spreadsheet_id: &str, range: &str) -> String {
    format!(
        "{SHEETS_API}/{spreadsheet_id}/values/{}",
        urlencoding::encode(range)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seller-scout-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn env_override_wins_even_when_candidates_exist() {
        let dir = scratch_dir("creds-env");
        let candidate = dir.join("candidate.json");
        fs::write(&candidate, "{}").unwrap();

        let resolved = resolve_from(
            Some(dir.join("missing.json")),
            vec![candidate.clone()],
        );
        // Env var set but pointing nowhere means no credentials at all.
        assert_eq!(resolved, None);

        let resolved = resolve_from(Some(candidate.clone()), vec![]);
        assert_eq!(resolved, Some(candidate));
    }

    #[test]
    fn first_existing_candidate_is_picked() {
        let dir = scratch_dir("creds-order");
        let second = dir.join("second.json");
        fs::write(&second, "{}").unwrap();

        let resolved = resolve_from(None, vec![dir.join("first.json"), second.clone()]);
        assert_eq!(resolved, Some(second));
    }

    #[test]
    fn no_candidates_resolve_to_none() {
        assert_eq!(
            resolve_from(None, vec![PathBuf::from("/nonexistent/credentials.json")]),
            None
        );
    }

    #[test]
    fn key_file_token_uri_defaults_to_google() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{ "client_email": "bot@example.iam.gserviceaccount.com", "private_key": "pem" }"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn header_format_targets_first_row_only() {
        let request = header_format_request(421);
        let range = &request["repeatCell"]["range"];
        assert_eq!(range["sheetId"], 421);
        assert_eq!(range["startRowIndex"], 0);
        assert_eq!(range["endRowIndex"], 1);

        let format = &request["repeatCell"]["cell"]["userEnteredFormat"];
        assert_eq!(format["textFormat"]["bold"], true);
        assert_eq!(format["backgroundColor"]["blue"], 0.9);
    }

    fn spreadsheet_with(titles: &[(&str, i64)]) -> Spreadsheet {
        let sheets: Vec<serde_json::Value> = titles
            .iter()
            .map(|(title, id)| serde_json::json!({ "properties": { "sheetId": id, "title": title } }))
            .collect();
        serde_json::from_value(serde_json::json!({
            "spreadsheetId": "abc",
            "sheets": sheets,
        }))
        .unwrap()
    }

    #[test]
    fn missing_sheet_is_added_before_clear_and_write() {
        let spreadsheet = spreadsheet_with(&[("Products", 0)]);
        let plan = plan_update(&spreadsheet, "Suppliers");

        assert_eq!(plan[0], UpdateStep::AddSheet);
        let add = plan.iter().position(|s| *s == UpdateStep::AddSheet).unwrap();
        let clear = plan.iter().position(|s| *s == UpdateStep::ClearValues).unwrap();
        let write = plan.iter().position(|s| *s == UpdateStep::WriteValues).unwrap();
        assert!(add < clear && clear < write);
    }

    #[test]
    fn existing_sheet_is_not_recreated() {
        let spreadsheet = spreadsheet_with(&[("Products", 0), ("Suppliers", 421)]);
        let plan = plan_update(&spreadsheet, "Suppliers");
        assert_eq!(plan, WRITE_STEPS.to_vec());
    }

    #[test]
    fn range_segment_is_percent_encoded() {
        let url = format!("{}:clear", values_url("abc", "Q3 #Sales!A1:ZZ"));
        let parsed = reqwest::Url::parse(&url).unwrap();

        // An unencoded '#' would shear the range and verb off into the
        // fragment; the whole range must stay in the path.
        assert_eq!(parsed.fragment(), None);
        assert!(parsed.path().ends_with("/values/Q3%20%23Sales%21A1%3AZZ:clear"));

        let url = values_url("abc", "What?Now!A1");
        let parsed = reqwest::Url::parse(&url).unwrap();
        assert_eq!(parsed.query(), None);
    }

    #[test]
    fn view_url_is_canonical() {
        assert_eq!(
            view_url("1AbC"),
            "https://docs.google.com/spreadsheets/d/1AbC"
        );
    }
}
