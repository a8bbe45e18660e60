//! SMTP transport via lettre.
//!
//! lettre's `SmtpTransport` is blocking, so every call runs on the blocking
//! pool and the async side only awaits the join handle.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, Transport};
use secrecy::ExposeSecret;

use super::{MailTransport, OutgoingEmail};
use crate::config::SmtpConfig;
use crate::error::TransportError;

const NAME: &str = "smtp";

/// Connection-level timeout handed to lettre.
const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

pub struct SmtpTransport {
    host: String,
    inner: lettre::SmtpTransport,
}

impl SmtpTransport {
    pub fn new(config: SmtpConfig) -> Result<Self, TransportError> {
        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let inner = lettre::SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| TransportError::Unavailable {
                name: NAME.into(),
                reason: format!("SMTP relay error: {e}"),
            })?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            host: config.host,
            inner,
        })
    }
}

/// Assemble a multipart/alternative message with text and HTML parts.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, TransportError> {
    let from: Mailbox = email.from.parse().map_err(|e| TransportError::InvalidAddress {
        address: email.from.clone(),
        reason: format!("{e}"),
    })?;
    let to: Mailbox = email.to.parse().map_err(|e| TransportError::InvalidAddress {
        address: email.to.clone(),
        reason: format!("{e}"),
    })?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            email.html_body.clone(),
        ))
        .map_err(|e| TransportError::Build(format!("Failed to build email: {e}")))
}

fn classify(to: &str, err: lettre::transport::smtp::Error) -> TransportError {
    if err.is_permanent() || err.is_transient() {
        // The server answered; this recipient was refused.
        TransportError::Rejected {
            name: NAME.into(),
            to: to.to_string(),
            reason: err.to_string(),
        }
    } else {
        TransportError::Unavailable {
            name: NAME.into(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    fn name(&self) -> &str {
        NAME
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let message = build_message(email)?;
        let transport = self.inner.clone();
        let to = email.to.clone();

        let result = tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| TransportError::Unavailable {
                name: NAME.into(),
                reason: format!("SMTP task failed: {e}"),
            })?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to, "Email sent");
                Ok(())
            }
            Err(e) => Err(classify(&to, e)),
        }
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        let transport = self.inner.clone();
        let reachable = tokio::task::spawn_blocking(move || transport.test_connection())
            .await
            .map_err(|e| TransportError::Unavailable {
                name: NAME.into(),
                reason: format!("SMTP task failed: {e}"),
            })?;

        match reachable {
            Ok(true) => Ok(()),
            Ok(false) => Err(TransportError::Unavailable {
                name: NAME.into(),
                reason: format!("{} did not accept a connection", self.host),
            }),
            Err(e) => Err(TransportError::Unavailable {
                name: NAME.into(),
                reason: e.to_string(),
            }),
        }
    }
}
