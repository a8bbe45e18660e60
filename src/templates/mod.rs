//! Email templates.

pub mod model;
pub mod routes;

pub use model::{EmailTemplate, NewTemplate, TemplateUpdate};
