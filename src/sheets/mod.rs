//! Spreadsheet sources — where contact grids come from.

pub mod google;
pub mod routes;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SheetsError;

pub use google::GoogleSheetsClient;

/// Range used when the caller does not name one.
pub const DEFAULT_RANGE: &str = "A:Z";

/// Rows of cells; the first row is the header.
pub type Grid = Vec<Vec<String>>;

/// Spreadsheet title plus its tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub title: String,
    pub sheets: Vec<SheetInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetInfo {
    pub id: Option<i64>,
    pub title: String,
}

#[async_trait]
pub trait SpreadsheetSource: Send + Sync {
    /// Fetch the cells in `range`. `None` when the spreadsheet does not exist.
    async fn fetch_grid(&self, source_id: &str, range: &str) -> Result<Option<Grid>, SheetsError>;

    /// Fetch title and tab list. `None` when the spreadsheet does not exist.
    async fn fetch_metadata(&self, source_id: &str) -> Result<Option<SpreadsheetInfo>, SheetsError>;
}
