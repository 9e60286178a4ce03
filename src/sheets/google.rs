//! Google Sheets backend: Sheets v4 and Drive v3 REST APIs over reqwest.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{SpreadsheetAccessError, WorksheetWriteError};
use crate::sheets::auth::{AccessTokenSource, SHEETS_SCOPES, ServiceAccountKey, ServiceAccountTokens};
use crate::sheets::{SheetStore, Spreadsheet};

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// API base URLs, overridable for tests.
#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    pub sheets_base: String,
    pub drive_base: String,
}

impl Default for GoogleSheetsConfig {
    fn default() -> Self {
        Self {
            sheets_base: "https://sheets.googleapis.com/v4".to_string(),
            drive_base: "https://www.googleapis.com/drive/v3".to_string(),
        }
    }
}

// ── HTTP plumbing ───────────────────────────────────────────────────

/// A failed API call, before it is mapped to a caller-specific error.
#[derive(Debug)]
struct ApiFailure {
    status: Option<StatusCode>,
    message: String,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl ApiFailure {
    fn local(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// Append path segments to a base URL, percent-encoding each one.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ApiFailure> {
    let mut url =
        Url::parse(base).map_err(|e| ApiFailure::local(format!("invalid base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ApiFailure::local(format!("invalid base URL {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Quote a worksheet title for A1 notation: `it's` → `'it''s'`.
pub fn a1_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Escape a value for a Drive `q` string literal.
fn drive_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Pull `error.message` out of a Google error body, if there is one.
fn google_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Shared HTTP client + token source.
#[derive(Clone)]
struct Api {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    config: GoogleSheetsConfig,
}

impl Api {
    async fn call(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, ApiFailure> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| ApiFailure::local(e.to_string()))?;

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ApiFailure::local(format!("request failed: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiFailure::local(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ApiFailure {
                status: Some(status),
                message: google_error_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiFailure::local(format!("invalid JSON response: {e}")))
    }
}

// ── Store ───────────────────────────────────────────────────────────

/// Google Sheets, authenticated with a service account.
pub struct GoogleSheets {
    api: Api,
}

impl GoogleSheets {
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_config(tokens, GoogleSheetsConfig::default())
    }

    pub fn with_config(tokens: Arc<dyn AccessTokenSource>, config: GoogleSheetsConfig) -> Self {
        Self {
            api: Api {
                http: reqwest::Client::new(),
                tokens,
                config,
            },
        }
    }

    /// Load a service-account key and request spreadsheet + drive scopes.
    pub fn from_service_account(path: &Path) -> Result<Self, SpreadsheetAccessError> {
        let key = ServiceAccountKey::from_file(path)?;
        info!(client = %key.client_email, "Using Google service account");
        Ok(Self::new(Arc::new(ServiceAccountTokens::new(key, &SHEETS_SCOPES))))
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn open(&self, name: &str) -> Result<Box<dyn Spreadsheet>, SpreadsheetAccessError> {
        let request_failed = |e: ApiFailure| match e.status {
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                SpreadsheetAccessError::Auth(e.to_string())
            }
            _ => SpreadsheetAccessError::Request(e.to_string()),
        };

        let mut url = endpoint(&self.api.config.drive_base, &["files"]).map_err(request_failed)?;
        url.query_pairs_mut()
            .append_pair(
                "q",
                &format!(
                    "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
                    drive_literal(name)
                ),
            )
            .append_pair("fields", "files(id,name)")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        let listing = self
            .api
            .call(Method::GET, url, None)
            .await
            .map_err(request_failed)?;
        let listing: FileList = serde_json::from_value(listing)
            .map_err(|e| SpreadsheetAccessError::Request(format!("unexpected file list: {e}")))?;

        let file = listing
            .files
            .into_iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SpreadsheetAccessError::NotFound(name.to_string()))?;

        info!(spreadsheet = %file.name, id = %file.id, "Opened spreadsheet");

        Ok(Box::new(GoogleSpreadsheet {
            api: self.api.clone(),
            id: file.id,
            name: file.name,
        }))
    }
}

// ── Spreadsheet ─────────────────────────────────────────────────────

/// One spreadsheet document, by Drive file id.
pub struct GoogleSpreadsheet {
    api: Api,
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SheetList {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSpreadsheet {
    async fn sheet_id(&self, title: &str) -> Result<Option<i64>, ApiFailure> {
        let mut url = endpoint(&self.api.config.sheets_base, &["spreadsheets", &self.id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title)");

        let body = self.api.call(Method::GET, url, None).await?;
        let list: SheetList = serde_json::from_value(body)
            .map_err(|e| ApiFailure::local(format!("unexpected sheet list: {e}")))?;

        Ok(list
            .sheets
            .into_iter()
            .find(|s| s.properties.title == title)
            .map(|s| s.properties.sheet_id))
    }

    async fn batch_update(&self, request: Value) -> Result<Value, ApiFailure> {
        let batch = format!("{}:batchUpdate", self.id);
        let url = endpoint(&self.api.config.sheets_base, &["spreadsheets", &batch])?;
        self.api
            .call(Method::POST, url, Some(json!({ "requests": [request] })))
            .await
    }
}

#[async_trait]
impl Spreadsheet for GoogleSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn delete_worksheet(&self, title: &str) -> Result<(), WorksheetWriteError> {
        let failed = |e: ApiFailure| WorksheetWriteError::Delete {
            title: title.to_string(),
            reason: e.to_string(),
        };

        let sheet_id = self
            .sheet_id(title)
            .await
            .map_err(failed)?
            .ok_or_else(|| WorksheetWriteError::NotFound(title.to_string()))?;

        self.batch_update(json!({ "deleteSheet": { "sheetId": sheet_id } }))
            .await
            .map_err(failed)?;

        debug!(worksheet = %title, sheet_id, "Deleted worksheet");
        Ok(())
    }

    async fn add_worksheet(
        &self,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), WorksheetWriteError> {
        self.batch_update(json!({
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": cols },
                }
            }
        }))
        .await
        .map_err(|e| WorksheetWriteError::Create {
            title: title.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn append_rows(
        &self,
        title: &str,
        rows: &[Vec<String>],
    ) -> Result<(), WorksheetWriteError> {
        let failed = |e: ApiFailure| WorksheetWriteError::Append {
            title: title.to_string(),
            reason: e.to_string(),
        };
        if rows.is_empty() {
            return Ok(());
        }

        let range = format!("{}!A1:append", a1_sheet(title));
        let mut url = endpoint(
            &self.api.config.sheets_base,
            &["spreadsheets", &self.id, "values", &range],
        )
        .map_err(failed)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        self.api
            .call(Method::POST, url, Some(json!({ "values": rows })))
            .await
            .map_err(failed)?;
        Ok(())
    }

    async fn read_rows(&self, title: &str) -> Result<Vec<Vec<String>>, WorksheetWriteError> {
        let failed = |e: ApiFailure| WorksheetWriteError::Read {
            title: title.to_string(),
            reason: e.to_string(),
        };

        let range = a1_sheet(title);
        let url = endpoint(
            &self.api.config.sheets_base,
            &["spreadsheets", &self.id, "values", &range],
        )
        .map_err(failed)?;

        let body = self.api.call(Method::GET, url, None).await.map_err(failed)?;
        let range: ValueRange = serde_json::from_value(body)
            .map_err(|e| failed(ApiFailure::local(format!("unexpected value range: {e}"))))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }
}
