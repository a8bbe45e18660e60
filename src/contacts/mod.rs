//! Contacts — recipient records and spreadsheet import.

pub mod importer;
pub mod model;
pub mod routes;

pub use importer::{ImportColumns, ImportRequest, ImportSummary, import_from_source, parse_contacts};
pub use model::{Contact, CustomFields, FieldValue, NewContact, is_valid_email};
