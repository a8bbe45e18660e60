//! Contact importer — turns spreadsheet rows into validated contacts.
//!
//! Row 0 is always the header. Data rows without a usable email are skipped,
//! not reported as errors. A re-import from the same source replaces the
//! previous batch instead of appending to it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::{Contact, FieldValue, NewContact, is_valid_email};
use crate::error::{Error, Result};
use crate::sheets::{DEFAULT_RANGE, SpreadsheetSource};
use crate::store::Database;

/// Which columns of the grid hold the email address and the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportColumns {
    pub email_column: usize,
    pub name_column: Option<usize>,
}

/// Request body for importing from a spreadsheet source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub email_column: usize,
    #[serde(default)]
    pub name_column: Option<usize>,
    #[serde(default)]
    pub range: Option<String>,
}

impl ImportRequest {
    pub fn columns(&self) -> ImportColumns {
        ImportColumns {
            email_column: self.email_column,
            name_column: self.name_column,
        }
    }
}

/// Outcome of a replace-by-source import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub source_id: String,
    pub imported: usize,
    pub contacts: Vec<Contact>,
}

/// Parse data rows into contact drafts, preserving row order.
pub fn parse_contacts(rows: &[Vec<String>], columns: &ImportColumns) -> Vec<NewContact> {
    let Some((headers, data)) = rows.split_first() else {
        return Vec::new();
    };

    let mut contacts = Vec::with_capacity(data.len());
    for (row_idx, row) in data.iter().enumerate() {
        let Some(email) = row.get(columns.email_column).map(|e| e.trim()) else {
            debug!(row = row_idx + 1, "Skipping row shorter than email column");
            continue;
        };
        if email.is_empty() || !is_valid_email(email) {
            debug!(row = row_idx + 1, "Skipping row without a valid email");
            continue;
        }

        let mut contact = NewContact::new(email);
        contact.name = columns
            .name_column
            .and_then(|idx| row.get(idx))
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        for (idx, header) in headers.iter().enumerate() {
            if idx == columns.email_column || Some(idx) == columns.name_column {
                continue;
            }
            let key = header.trim();
            if key.is_empty() {
                continue;
            }
            if let Some(value) = row.get(idx).filter(|v| !v.is_empty()) {
                contact
                    .custom_fields
                    .insert(key.to_string(), FieldValue::Text(value.clone()));
            }
        }

        contacts.push(contact);
    }
    contacts
}

/// Replace every contact tagged with `source_id` by the contacts parsed from `rows`.
pub async fn import_rows(
    db: &dyn Database,
    source_id: &str,
    rows: &[Vec<String>],
    columns: &ImportColumns,
) -> Result<ImportSummary> {
    let contacts: Vec<Contact> = parse_contacts(rows, columns)
        .into_iter()
        .map(|c| c.with_source(source_id).into_contact())
        .collect();

    let removed = db.replace_contacts_by_source(source_id, &contacts).await?;
    info!(
        source_id,
        imported = contacts.len(),
        replaced = removed,
        "Contacts imported"
    );

    Ok(ImportSummary {
        source_id: source_id.to_string(),
        imported: contacts.len(),
        contacts,
    })
}

/// Fetch a grid from the spreadsheet source and import it.
pub async fn import_from_source(
    db: &dyn Database,
    sheets: &dyn SpreadsheetSource,
    source_id: &str,
    request: &ImportRequest,
) -> Result<ImportSummary> {
    let range = request.range.as_deref().unwrap_or(DEFAULT_RANGE);
    let grid = sheets
        .fetch_grid(source_id, range)
        .await?
        .ok_or_else(|| Error::not_found("Spreadsheet", source_id))?;

    import_rows(db, source_id, &grid, &request.columns()).await
}
