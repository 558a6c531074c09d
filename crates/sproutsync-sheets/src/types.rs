//! Google Drive v3, Sheets v4 and OAuth2 wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Drive
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub modified_time: DateTime<Utc>,
    pub mime_type: String,
    #[serde(default)]
    pub trashed: bool,
}

#[derive(Debug, Deserialize)]
pub struct FileParents {
    #[serde(default)]
    pub parents: Vec<String>,
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSpreadsheet {
    pub spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SpreadsheetSheets {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

/// One cell's `userEnteredValue`. Exactly one field is set; none for blank.
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
}

impl ExtendedValue {
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => Self {
                number_value: n.as_f64(),
                ..Self::default()
            },
            serde_json::Value::String(s) if !s.is_empty() => Self {
                string_value: Some(s.clone()),
                ..Self::default()
            },
            serde_json::Value::Bool(b) => Self {
                bool_value: Some(*b),
                ..Self::default()
            },
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Self {
                string_value: Some(value.to_string()),
                ..Self::default()
            },
            serde_json::Value::String(_) | serde_json::Value::Null => Self::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and OAuth
// ---------------------------------------------------------------------------

/// `{"error": {"code": 429, "message": "...", "status": "RESOURCE_EXHAUSTED"}}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// `{"error": "invalid_grant", "error_description": "Bad Request"}`
#[derive(Debug, Deserialize)]
pub struct TokenErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
