//! Campaign Dispatch — contact import, personalized bulk email, delivery tracking.

pub mod campaigns;
pub mod config;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod server;
pub mod sheets;
pub mod store;
pub mod templates;
pub mod transport;
