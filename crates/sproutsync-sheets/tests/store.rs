//! Integration tests for `GoogleStore` using wiremock HTTP mocks.

use serde_json::json;
use sproutsync_engine::{AccessToken, DocumentStore, ErrorClass, StoreError};
use sproutsync_sheets::GoogleStore;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_store(server: &MockServer) -> GoogleStore {
    GoogleStore::with_base_urls(
        5,
        &format!("{}/drive/v3", server.uri()),
        &format!("{}/sheets/v4", server.uri()),
    )
    .expect("store construction should not fail")
}

fn token() -> AccessToken {
    AccessToken::new("ya29.test")
}

fn sheets_listing() -> serde_json::Value {
    json!({
        "sheets": [
            { "properties": { "sheetId": 0, "title": "Sheet1" } },
            { "properties": { "sheetId": 11, "title": "Facebook" } }
        ]
    })
}

#[tokio::test]
async fn list_documents_follows_page_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", "Bearer ya29.test"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{
                "id": "doc-2",
                "name": "Sprout Analytics - Marketing - Last Updated 2025-01-01 09:00",
                "modifiedTime": "2025-01-01T09:00:00Z",
                "mimeType": "application/vnd.google-apps.spreadsheet"
            }]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("supportsAllDrives", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{
                "id": "doc-1",
                "name": "Sprout Analytics - Marketing",
                "modifiedTime": "2024-12-01T09:00:00Z",
                "mimeType": "application/vnd.google-apps.spreadsheet",
                "trashed": false
            }],
            "nextPageToken": "p2"
        })))
        .mount(&server)
        .await;

    let entries = test_store(&server)
        .list_documents(&token(), "folder-1", "Sprout Analytics - Marketing")
        .await
        .unwrap();

    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["doc-1", "doc-2"]);
}

#[tokio::test]
async fn list_documents_sends_escaped_folder_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "'folder-1' in parents and name contains 'O\\'Brien' \
             and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = test_store(&server)
        .list_documents(&token(), "folder-1", "O'Brien")
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn quota_errors_keep_google_status_for_classification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded for quota metric 'Queries'",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let err = test_store(&server)
        .list_documents(&token(), "folder-1", "x")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Status { status: 429, .. }));
    assert_eq!(ErrorClass::of(&err), ErrorClass::Quota);
}

#[tokio::test]
async fn create_document_returns_spreadsheet_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sheets/v4/spreadsheets"))
        .and(body_partial_json(json!({
            "properties": { "title": "Sprout Analytics - Sales - Last Updated 2025-01-01 09:00" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "spreadsheetId": "new-doc" })),
        )
        .mount(&server)
        .await;

    let id = test_store(&server)
        .create_document(
            &token(),
            "Sprout Analytics - Sales - Last Updated 2025-01-01 09:00",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(id, "new-doc");
}

#[tokio::test]
async fn create_document_replaces_default_tab_with_network_tabs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sheets/v4/spreadsheets"))
        .and(body_partial_json(json!({
            "sheets": [
                { "properties": { "title": "Facebook" } },
                { "properties": { "title": "LinkedIn" } }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "spreadsheetId": "new-doc" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = test_store(&server)
        .create_document(&token(), "Sprout Analytics - Sales", &["Facebook", "LinkedIn"])
        .await
        .unwrap();
    assert_eq!(id, "new-doc");
}

#[tokio::test]
async fn rename_document_patches_name() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/drive/v3/files/doc-1"))
        .and(body_partial_json(json!({ "name": "Renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "doc-1" })))
        .expect(1)
        .mount(&server)
        .await;

    test_store(&server)
        .rename_document(&token(), "doc-1", "Renamed")
        .await
        .unwrap();
}

#[tokio::test]
async fn move_document_swaps_parents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/doc-1"))
        .and(query_param("fields", "parents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "parents": ["root-id"] })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/drive/v3/files/doc-1"))
        .and(query_param("addParents", "folder-1"))
        .and(query_param("removeParents", "root-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "doc-1" })))
        .expect(1)
        .mount(&server)
        .await;

    test_store(&server)
        .move_document(&token(), "doc-1", "folder-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn list_subsections_returns_tab_titles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheets/v4/spreadsheets/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sheets_listing()))
        .mount(&server)
        .await;

    let names = test_store(&server)
        .list_subsections(&token(), "doc-1")
        .await
        .unwrap();
    assert_eq!(names, vec!["Sheet1", "Facebook"]);
}

#[tokio::test]
async fn duplicate_add_subsection_is_classified_as_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sheets/v4/spreadsheets/doc-1:batchUpdate"))
        .and(body_partial_json(json!({
            "requests": [{ "addSheet": { "properties": { "title": "Facebook" } } }]
        })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Invalid requests[0].addSheet: A sheet with the name \"Facebook\" already exists. Please enter another name.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = test_store(&server)
        .add_subsection(&token(), "doc-1", "Facebook")
        .await
        .unwrap_err();
    assert_eq!(ErrorClass::of(&err), ErrorClass::AlreadyExists);
}

#[tokio::test]
async fn write_rows_targets_the_named_tab_in_one_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheets/v4/spreadsheets/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sheets_listing()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sheets/v4/spreadsheets/doc-1:batchUpdate"))
        .and(body_partial_json(json!({
            "requests": [
                { "updateSheetProperties": { "properties": { "sheetId": 11 } } },
                { "updateCells": { "range": { "sheetId": 11 }, "fields": "userEnteredValue" } },
                { "updateCells": { "start": { "sheetId": 11, "rowIndex": 0, "columnIndex": 0 } } }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "spreadsheetId": "doc-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = vec![
        vec![json!("Date"), json!("Profile"), json!("Impressions")],
        vec![json!("2025-01-02"), json!("acme"), json!(5)],
    ];
    test_store(&server)
        .write_rows(&token(), "doc-1", "Facebook", &rows)
        .await
        .unwrap();
}

#[tokio::test]
async fn write_rows_to_missing_tab_sends_no_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheets/v4/spreadsheets/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sheets_listing()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sheets/v4/spreadsheets/doc-1:batchUpdate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = test_store(&server)
        .write_rows(&token(), "doc-1", "YouTube", &[vec![json!("Date")]])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("YouTube"));
    assert_eq!(ErrorClass::of(&err), ErrorClass::Other);
}

#[tokio::test]
async fn expired_token_is_classified_as_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sheets/v4/spreadsheets/doc-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": 401,
                "message": "Request had invalid authentication credentials.",
                "status": "UNAUTHENTICATED"
            }
        })))
        .mount(&server)
        .await;

    let err = test_store(&server)
        .list_subsections(&token(), "doc-1")
        .await
        .unwrap_err();
    assert_eq!(ErrorClass::of(&err), ErrorClass::Auth);
}
