//! Development transport — logs each message and reports success.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{MailTransport, OutgoingEmail};
use crate::error::TransportError;

#[derive(Debug, Default)]
pub struct SimulatedTransport {
    sent: AtomicUsize,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MailTransport for SimulatedTransport {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let sent = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(to = %email.to, subject = %email.subject, sent, "[SIMULATED] Email sent");
        Ok(())
    }
}
