//! Google Sheets v4 REST client (API-key auth, read-only).

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::{Grid, SheetInfo, SpreadsheetInfo, SpreadsheetSource};
use crate::config::SheetsConfig;
use crate::error::SheetsError;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub struct GoogleSheetsClient {
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl GoogleSheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("Google Sheets API key not found, spreadsheet import is disabled");
        }
        Self {
            api_key: config.api_key,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let key = self.api_key.as_ref().ok_or(SheetsError::NotConfigured)?;
        let mut url = Url::parse(API_BASE)
            .map_err(|e| SheetsError::Request(format!("Invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Request("API base URL cannot have a path".into()))?
            .extend(segments);
        url.query_pairs_mut().append_pair("key", key.expose_secret());
        Ok(url)
    }

    /// GET `url`, mapping 404 to `None` and other failures to errors.
    async fn get_json(&self, url: Url) -> Result<Option<Value>, SheetsError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SheetsError::Request(e.without_url().to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Value>()
            .await
            .map(Some)
            .map_err(|e| SheetsError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SpreadsheetSource for GoogleSheetsClient {
    async fn fetch_grid(&self, source_id: &str, range: &str) -> Result<Option<Grid>, SheetsError> {
        let url = self.api_url(&[source_id, "values", range])?;
        let Some(body) = self.get_json(url).await? else {
            return Ok(None);
        };
        let grid = parse_values(&body)?;
        tracing::debug!(source_id, range, rows = grid.len(), "Fetched spreadsheet values");
        Ok(Some(grid))
    }

    async fn fetch_metadata(&self, source_id: &str) -> Result<Option<SpreadsheetInfo>, SheetsError> {
        let mut url = self.api_url(&[source_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "properties.title,sheets.properties");
        let Some(body) = self.get_json(url).await? else {
            return Ok(None);
        };
        Ok(Some(parse_metadata(source_id, &body)))
    }
}

/// Extract the `values` grid from a `spreadsheets.values.get` response.
///
/// A missing `values` key means the range is empty. Non-string cells are
/// rendered as text.
pub fn parse_values(body: &Value) -> Result<Grid, SheetsError> {
    let Some(values) = body.get("values") else {
        return Ok(Vec::new());
    };
    let rows = values
        .as_array()
        .ok_or_else(|| SheetsError::InvalidResponse("`values` is not an array".into()))?;

    rows.iter()
        .map(|row| {
            let cells = row
                .as_array()
                .ok_or_else(|| SheetsError::InvalidResponse("row is not an array".into()))?;
            Ok(cells.iter().map(cell_text).collect())
        })
        .collect()
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Build [`SpreadsheetInfo`] from a `spreadsheets.get` response.
pub fn parse_metadata(source_id: &str, body: &Value) -> SpreadsheetInfo {
    let title = body
        .pointer("/properties/title")
        .and_then(Value::as_str)
        .unwrap_or("Untitled Spreadsheet")
        .to_string();

    let sheets = body
        .get("sheets")
        .and_then(Value::as_array)
        .map(|sheets| {
            sheets
                .iter()
                .map(|sheet| SheetInfo {
                    id: sheet.pointer("/properties/sheetId").and_then(Value::as_i64),
                    title: sheet
                        .pointer("/properties/title")
                        .and_then(Value::as_str)
                        .unwrap_or("Untitled Sheet")
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    SpreadsheetInfo {
        id: source_id.to_string(),
        title,
        sheets,
    }
}
