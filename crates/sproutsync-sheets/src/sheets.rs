//! Sheets v4 operations: create, list tabs, add a tab, replace a tab's rows.

use serde_json::{json, Value};
use sproutsync_engine::{AccessToken, Row};

use crate::client::GoogleStore;
use crate::error::GoogleError;
use crate::types::{CreatedSpreadsheet, ExtendedValue, SheetProperties, SpreadsheetSheets};

impl GoogleStore {
    /// Creates a spreadsheet in the caller's root folder and returns its id.
    ///
    /// Named tabs replace Google's default "Sheet1"; with none the default
    /// tab stays.
    pub(crate) async fn create_spreadsheet(
        &self,
        token: &AccessToken,
        title: &str,
        tabs: &[&str],
    ) -> Result<String, GoogleError> {
        let url = self.sheets_endpoint("spreadsheets")?;
        let request = self
            .client
            .post(url)
            .query(&[("fields", "spreadsheetId")])
            .json(&create_body(title, tabs));
        let created: CreatedSpreadsheet = self.send(request, token, "create spreadsheet").await?;
        tracing::info!(spreadsheet_id = %created.spreadsheet_id, title, tabs = tabs.len(), "created spreadsheet");
        Ok(created.spreadsheet_id)
    }

    pub(crate) async fn sheet_properties(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetProperties>, GoogleError> {
        let url = self.sheets_endpoint(&format!("spreadsheets/{spreadsheet_id}"))?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let listing: SpreadsheetSheets = self.send(request, token, "list sheets").await?;
        Ok(listing.sheets.into_iter().map(|s| s.properties).collect())
    }

    pub(crate) async fn add_sheet(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<(), GoogleError> {
        let requests = vec![json!({ "addSheet": { "properties": { "title": title } } })];
        self.batch_update(token, spreadsheet_id, requests, "add sheet")
            .await
    }

    /// Clears `title` and writes `rows` from A1 in a single batch update, so
    /// readers never observe a half-written tab.
    pub(crate) async fn replace_sheet_rows(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        title: &str,
        rows: &[Row],
    ) -> Result<(), GoogleError> {
        let sheet_id = self
            .sheet_properties(token, spreadsheet_id)
            .await?
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .ok_or_else(|| GoogleError::MissingSubsection(title.to_owned()))?;

        let requests = replace_requests(sheet_id, rows);
        self.batch_update(token, spreadsheet_id, requests, "write rows")
            .await?;
        tracing::debug!(spreadsheet_id, sheet = title, rows = rows.len(), "sheet rows replaced");
        Ok(())
    }

    async fn batch_update(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        requests: Vec<Value>,
        context: &str,
    ) -> Result<(), GoogleError> {
        let url = self.sheets_endpoint(&format!("spreadsheets/{spreadsheet_id}:batchUpdate"))?;
        let request = self
            .client
            .post(url)
            .json(&json!({ "requests": requests }));
        let _: serde::de::IgnoredAny = self.send(request, token, context).await?;
        Ok(())
    }
}

pub(crate) fn create_body(title: &str, tabs: &[&str]) -> Value {
    let mut body = json!({ "properties": { "title": title } });
    if !tabs.is_empty() {
        body["sheets"] = tabs
            .iter()
            .map(|tab| json!({ "properties": { "title": tab } }))
            .collect();
    }
    body
}

/// Resize, clear, then write: the grid is sized to the payload first so a
/// long history never overflows the default 1000-row grid.
pub(crate) fn replace_requests(sheet_id: i64, rows: &[Row]) -> Vec<Value> {
    let row_count = rows.len().max(1);
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let grid_rows: Vec<Value> = rows
        .iter()
        .map(|row| json!({ "values": row.iter().map(cell).collect::<Vec<_>>() }))
        .collect();

    vec![
        json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "rowCount": row_count, "columnCount": column_count }
                },
                "fields": "gridProperties(rowCount,columnCount)"
            }
        }),
        json!({
            "updateCells": {
                "range": { "sheetId": sheet_id },
                "fields": "userEnteredValue"
            }
        }),
        json!({
            "updateCells": {
                "start": { "sheetId": sheet_id, "rowIndex": 0, "columnIndex": 0 },
                "rows": grid_rows,
                "fields": "userEnteredValue"
            }
        }),
    ]
}

fn cell(value: &Value) -> Value {
    let entered = ExtendedValue::from_json(value);
    if entered == ExtendedValue::default() {
        json!({})
    } else {
        json!({ "userEnteredValue": entered })
    }
}
