//! Mail transport abstraction.
//!
//! The dispatcher only sees [`MailTransport`]. SMTP is used when configured;
//! otherwise sends are simulated so development setups keep working.

pub mod simulated;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::SmtpConfig;
use crate::error::TransportError;

pub use simulated::SimulatedTransport;
pub use smtp::SmtpTransport;

/// One fully rendered message addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEmail {
    pub to: String,
    /// Sender mailbox, `Name <address>`.
    pub from: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Success/failure counts over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub success_count: usize,
    pub failure_count: usize,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Submit one message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;

    /// Verify the transport can be reached at all.
    async fn health_check(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Send each message in order and count the outcomes.
    async fn send_bulk(&self, emails: &[OutgoingEmail]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for email in emails {
            match self.send(email).await {
                Ok(()) => outcome.success_count += 1,
                Err(e) => {
                    tracing::warn!(to = %email.to, error = %e, "Bulk send failed for recipient");
                    outcome.failure_count += 1;
                }
            }
        }
        outcome
    }
}

/// SMTP when configured, simulated otherwise.
pub fn create_transport(config: Option<SmtpConfig>) -> Result<Arc<dyn MailTransport>, TransportError> {
    match config {
        Some(config) => {
            tracing::info!(host = %config.host, port = config.port, "Using SMTP mail transport");
            Ok(Arc::new(SmtpTransport::new(config)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, email sending will be simulated");
            Ok(Arc::new(SimulatedTransport::new()))
        }
    }
}
