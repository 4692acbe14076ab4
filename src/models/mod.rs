//! Data models for seller records and Google Sheets API payloads

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

/// Advisory appended to every record; direct messaging is login-gated.
pub const CONTACT_NOTE: &str = "Direct messaging requires Alibaba account login. \
    Visit the product page or company profile to send inquiries.";

/// Supplier verification badge state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verification {
    Verified,
    Unverified,
    Unknown,
}

/// Seller information extracted from a single product page.
///
/// Every field defaults to `Unknown`/empty; absence is a valid terminal
/// state, not an error. A failed page fetch is folded into `error` rather
/// than raised.
#[derive(Debug, Clone, Serialize)]
pub struct SellerRecord {
    pub url: String,
    pub name: String,
    pub verification: Verification,
    #[serde(serialize_with = "years_as_text")]
    pub years: Option<u32>,
    #[serde(serialize_with = "unknown_if_none")]
    pub country: Option<String>,
    pub profile_url: Option<String>,
    pub contact: BTreeMap<String, String>,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SellerRecord {
    /// Record with every field at its documented default.
    pub fn unknown(url: &str) -> Self {
        Self {
            url: url.to_string(),
            name: "Unknown".to_string(),
            verification: Verification::Unknown,
            years: None,
            country: None,
            profile_url: None,
            contact: BTreeMap::new(),
            note: CONTACT_NOTE.to_string(),
            error: None,
        }
    }

    /// Record carrying a fetch-level failure instead of extracted fields.
    pub fn fetch_failed(url: &str, message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::unknown(url)
        }
    }
}

fn years_as_text<S: Serializer>(years: &Option<u32>, ser: S) -> Result<S::Ok, S::Error> {
    match years {
        Some(n) => ser.serialize_str(&format!("{n} years")),
        None => ser.serialize_str("Unknown"),
    }
}

fn unknown_if_none<S: Serializer>(value: &Option<String>, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(value.as_deref().unwrap_or("Unknown"))
}

/// Identifies where published rows should land.
///
/// No spreadsheet id means a brand-new spreadsheet is created.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
}

/// `values.update` request body
#[derive(Debug, Serialize)]
pub struct ValueRange {
    pub values: Vec<Vec<String>>,
}

/// Subset of the Sheets API spreadsheet resource we read back
#[derive(Debug, Deserialize)]
pub struct Spreadsheet {
    #[serde(rename = "spreadsheetId")]
    pub spreadsheet_id: String,
    #[serde(rename = "spreadsheetUrl")]
    pub spreadsheet_url: Option<String>,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    pub fn has_sheet(&self, title: &str) -> bool {
        self.sheets.iter().any(|s| s.properties.title == title)
    }

    /// Numeric sheet id for a tab title; the API defaults the first tab to 0.
    pub fn sheet_id(&self, title: &str) -> i64 {
        self.sheets
            .iter()
            .find(|s| s.properties.title == title)
            .map_or(0, |s| s.properties.sheet_id)
    }
}

/// One tab of a spreadsheet
#[derive(Debug, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
pub struct SheetProperties {
    #[serde(rename = "sheetId")]
    pub sheet_id: i64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_record_serializes_with_documented_defaults() {
        let record = SellerRecord::unknown("https://example.com/p/1");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["name"], "Unknown");
        assert_eq!(json["verification"], "Unknown");
        assert_eq!(json["years"], "Unknown");
        assert_eq!(json["country"], "Unknown");
        assert_eq!(json["profile_url"], serde_json::Value::Null);
        assert!(json["contact"].as_object().unwrap().is_empty());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn years_serialize_as_readable_text() {
        let mut record = SellerRecord::unknown("https://example.com/p/1");
        record.years = Some(5);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["years"], "5 years");
    }

    #[test]
    fn fetch_failure_is_folded_into_the_record() {
        let record = SellerRecord::fetch_failed("https://example.com/p/1", "timed out".into());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["error"], "timed out");
        assert_eq!(json["url"], "https://example.com/p/1");
    }

    #[test]
    fn sheet_lookup_by_title() {
        let spreadsheet: Spreadsheet = serde_json::from_value(serde_json::json!({
            "spreadsheetId": "abc",
            "sheets": [
                { "properties": { "sheetId": 0, "title": "Products" } },
                { "properties": { "sheetId": 421, "title": "Suppliers" } },
            ]
        }))
        .unwrap();

        assert!(spreadsheet.has_sheet("Suppliers"));
        assert!(!spreadsheet.has_sheet("Orders"));
        assert_eq!(spreadsheet.sheet_id("Suppliers"), 421);
        assert_eq!(spreadsheet.sheet_id("Orders"), 0);
    }
}
