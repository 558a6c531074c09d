//! Google Drive v3 + Sheets v4 behind the engine's [`DocumentStore`] port.
//!
//! The store holds no credentials of its own: every call carries the bearer
//! token the engine's session hands it. Retries live in the engine, so each
//! method here issues exactly one logical request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use sproutsync_core::DocumentEntry;
use sproutsync_engine::{AccessToken, DocumentStore, Row, StoreError};

use crate::error::GoogleError;
use crate::types::ApiErrorBody;

const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com/drive/v3/";
const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com/v4/";
const DOCUMENT_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// Client for the Drive and Sheets REST APIs.
///
/// Use [`GoogleStore::new`] for production or [`GoogleStore::with_base_urls`]
/// to point both APIs at a mock server in tests.
pub struct GoogleStore {
    pub(crate) client: Client,
    pub(crate) drive_url: Url,
    pub(crate) sheets_url: Url,
}

impl GoogleStore {
    /// # Errors
    ///
    /// Returns [`GoogleError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout_secs: u64) -> Result<Self, GoogleError> {
        Self::with_base_urls(timeout_secs, DEFAULT_DRIVE_URL, DEFAULT_SHEETS_URL)
    }

    /// # Errors
    ///
    /// Same as [`GoogleStore::new`], plus [`GoogleError::InvalidConfig`] if
    /// either base URL is not a valid URL.
    pub fn with_base_urls(
        timeout_secs: u64,
        drive_url: &str,
        sheets_url: &str,
    ) -> Result<Self, GoogleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sproutsync/0.1")
            .build()?;
        Ok(Self {
            client,
            drive_url: parse_base(drive_url)?,
            sheets_url: parse_base(sheets_url)?,
        })
    }

    pub(crate) fn drive_endpoint(&self, path: &str) -> Result<Url, GoogleError> {
        join(&self.drive_url, path)
    }

    pub(crate) fn sheets_endpoint(&self, path: &str) -> Result<Url, GoogleError> {
        join(&self.sheets_url, path)
    }

    /// Sends `request` with `token` and decodes a 2xx body as `T`.
    ///
    /// A non-2xx status becomes [`GoogleError::Api`] carrying Google's own
    /// message and status code name.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        token: &AccessToken,
        context: &str,
    ) -> Result<T, GoogleError> {
        let response = request.bearer_auth(token.as_str()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GoogleError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| GoogleError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

/// Exactly one trailing slash so `Url::join` appends instead of replacing the
/// last path segment.
fn parse_base(raw: &str) -> Result<Url, GoogleError> {
    let normalised = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| GoogleError::InvalidConfig(format!("base URL '{raw}': {e}")))
}

fn join(base: &Url, path: &str) -> Result<Url, GoogleError> {
    base.join(path)
        .map_err(|e| GoogleError::InvalidConfig(format!("endpoint '{path}': {e}")))
}

/// `"<message> (<STATUS>)"` from a Google error envelope, or the raw body.
pub(crate) fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{} ({status})", parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.trim().to_owned(),
    }
}

#[async_trait]
impl DocumentStore for GoogleStore {
    async fn list_documents(
        &self,
        token: &AccessToken,
        container_id: &str,
        name_pattern: &str,
    ) -> Result<Vec<DocumentEntry>, StoreError> {
        Ok(self.list_files(token, container_id, name_pattern).await?)
    }

    async fn create_document(
        &self,
        token: &AccessToken,
        title: &str,
        subsections: &[&str],
    ) -> Result<String, StoreError> {
        Ok(self.create_spreadsheet(token, title, subsections).await?)
    }

    async fn rename_document(
        &self,
        token: &AccessToken,
        document_id: &str,
        new_title: &str,
    ) -> Result<(), StoreError> {
        Ok(self.rename_file(token, document_id, new_title).await?)
    }

    async fn move_document(
        &self,
        token: &AccessToken,
        document_id: &str,
        container_id: &str,
    ) -> Result<(), StoreError> {
        Ok(self.move_file(token, document_id, container_id).await?)
    }

    async fn list_subsections(
        &self,
        token: &AccessToken,
        document_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let sheets = self.sheet_properties(token, document_id).await?;
        Ok(sheets.into_iter().map(|p| p.title).collect())
    }

    async fn add_subsection(
        &self,
        token: &AccessToken,
        document_id: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        Ok(self.add_sheet(token, document_id, name).await?)
    }

    async fn write_rows(
        &self,
        token: &AccessToken,
        document_id: &str,
        subsection: &str,
        rows: &[Row],
    ) -> Result<(), StoreError> {
        Ok(self.replace_sheet_rows(token, document_id, subsection, rows).await?)
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{DOCUMENT_URL_PREFIX}{document_id}/edit")
    }
}
