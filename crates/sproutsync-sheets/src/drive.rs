//! Drive v3 file operations: search, rename, and re-parent.

use serde_json::json;
use sproutsync_core::{DocumentEntry, SPREADSHEET_MIME_TYPE};
use sproutsync_engine::AccessToken;

use crate::client::GoogleStore;
use crate::error::GoogleError;
use crate::types::{DriveFile, FileList, FileParents};

const LIST_FIELDS: &str = "nextPageToken, files(id, name, modifiedTime, mimeType, trashed)";
const PAGE_SIZE: &str = "100";

/// Upper bound on listing pages, in case `nextPageToken` never clears.
const MAX_PAGES: u32 = 50;

/// Escapes a literal for a Drive query string.
pub(crate) fn escape_query_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive `q` expression for live spreadsheets in `folder_id` whose name
/// contains `name_pattern`.
pub(crate) fn search_query(folder_id: &str, name_pattern: &str) -> String {
    format!(
        "'{}' in parents and name contains '{}' and mimeType = '{SPREADSHEET_MIME_TYPE}' and trashed = false",
        escape_query_literal(folder_id),
        escape_query_literal(name_pattern),
    )
}

impl From<DriveFile> for DocumentEntry {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            modified_time: file.modified_time,
            mime_type: file.mime_type,
            trashed: file.trashed,
        }
    }
}

impl GoogleStore {
    /// All pages of a Drive search. The engine still filters the result,
    /// since Drive's `contains` is a prefix-token match, not a substring one.
    pub(crate) async fn list_files(
        &self,
        token: &AccessToken,
        folder_id: &str,
        name_pattern: &str,
    ) -> Result<Vec<DocumentEntry>, GoogleError> {
        let url = self.drive_endpoint("files")?;
        let query = search_query(folder_id, name_pattern);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(t) = page_token.as_deref() {
                params.push(("pageToken", t));
            }
            let request = self.client.get(url.clone()).query(&params);
            let listing: FileList = self.send(request, token, "drive file list").await?;
            entries.extend(listing.files.into_iter().map(DocumentEntry::from));

            match listing.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => return Ok(entries),
            }
            if page == MAX_PAGES {
                tracing::warn!(page, "drive listing page limit reached");
            }
        }
        Ok(entries)
    }

    pub(crate) async fn rename_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        new_name: &str,
    ) -> Result<(), GoogleError> {
        let url = self.drive_endpoint(&format!("files/{file_id}"))?;
        let request = self
            .client
            .patch(url)
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&json!({ "name": new_name }));
        let _: serde::de::IgnoredAny = self.send(request, token, "drive rename").await?;
        Ok(())
    }

    /// Moves `file_id` into `folder_id`, dropping every other parent.
    pub(crate) async fn move_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        folder_id: &str,
    ) -> Result<(), GoogleError> {
        let url = self.drive_endpoint(&format!("files/{file_id}"))?;

        let request = self
            .client
            .get(url.clone())
            .query(&[("fields", "parents"), ("supportsAllDrives", "true")]);
        let current: FileParents = self.send(request, token, "drive parents").await?;
        let previous = current
            .parents
            .iter()
            .filter(|p| p.as_str() != folder_id)
            .cloned()
            .collect::<Vec<_>>()
            .join(",");

        let mut params = vec![
            ("addParents", folder_id),
            ("supportsAllDrives", "true"),
            ("fields", "id, parents"),
        ];
        if !previous.is_empty() {
            params.push(("removeParents", previous.as_str()));
        }
        let request = self.client.patch(url).query(&params).json(&json!({}));
        let _: serde::de::IgnoredAny = self.send(request, token, "drive move").await?;
        tracing::debug!(file_id, folder_id, "moved document into folder");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_escapes_quotes_and_backslashes() {
        assert_eq!(escape_query_literal(r"O'Brien\Co"), r"O\'Brien\\Co");
    }

    #[test]
    fn query_restricts_to_live_spreadsheets_in_folder() {
        let q = search_query("folder-1", "Sprout Analytics - Marketing");
        assert_eq!(
            q,
            "'folder-1' in parents and name contains 'Sprout Analytics - Marketing' \
             and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
    }
}
