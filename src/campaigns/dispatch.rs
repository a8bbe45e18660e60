//! Dispatch orchestrator — drives one campaign send end to end.
//!
//! A send resolves the audience, claims the campaign with a conditional
//! `begin_send` write, renders and submits one message per recipient on a
//! bounded pool, then records per-recipient outcomes before the aggregate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::model::{Campaign, CampaignStatus, RecipientStatus};
use super::personalize::render_message;
use super::state::{CampaignAction, invalid_state};
use crate::config::DispatchConfig;
use crate::contacts::Contact;
use crate::error::{Error, Result, TransportError};
use crate::store::Database;
use crate::transport::{MailTransport, OutgoingEmail};

/// Result of one campaign send, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub campaign_id: Uuid,
    pub total_recipients: u32,
    pub successful: u32,
    pub failed: u32,
}

/// Outcome of one recipient, keyed by the contact it was sent to.
type RecipientOutcome = (Uuid, std::result::Result<DateTime<Utc>, TransportError>);

/// Resolved recipients of one send.
struct Audience {
    contacts: Vec<Contact>,
    /// Nobody was enrolled; enroll `contacts` once the send is claimed.
    needs_enrollment: bool,
}

pub struct Dispatcher {
    db: Arc<dyn Database>,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
    /// Campaign ids with a send in progress in this process.
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Releases a campaign's in-flight claim when the send finishes or fails.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

impl Dispatcher {
    pub fn new(
        db: Arc<dyn Database>,
        transport: Arc<dyn MailTransport>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            db,
            transport,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, id: Uuid) -> Result<InFlightGuard<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id) {
            return Err(invalid_state(id, CampaignStatus::Sending, CampaignAction::Send));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            id,
        })
    }

    /// Send `campaign_id` to its whole audience, once.
    pub async fn send_campaign(&self, campaign_id: Uuid) -> Result<DispatchReport> {
        let _claim = self.claim(campaign_id)?;

        let campaign = self
            .db
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| Error::not_found("Campaign", campaign_id))?;
        campaign.status.apply(campaign_id, CampaignAction::Send)?;

        let audience = self.resolve_recipients(&campaign).await?;
        let total = u32::try_from(audience.contacts.len()).unwrap_or(u32::MAX);

        let started_at = Utc::now();
        if !self.db.begin_send(campaign_id, total, started_at).await? {
            return match self.db.get_campaign(campaign_id).await? {
                Some(current) => Err(invalid_state(campaign_id, current.status, CampaignAction::Send)),
                None => Err(Error::not_found("Campaign", campaign_id)),
            };
        }
        if audience.needs_enrollment {
            let ids: Vec<Uuid> = audience.contacts.iter().map(|c| c.id).collect();
            self.db.enroll_contacts(campaign_id, &ids).await?;
        }
        info!(
            campaign_id = %campaign_id,
            recipients = total,
            transport = self.transport.name(),
            "Campaign send started"
        );

        if let Err(e) = self.transport.health_check().await {
            error!(campaign_id = %campaign_id, error = %e, "Transport health check failed, campaign left sending");
            return Err(Error::TransportUnavailable(e));
        }

        let messages = audience
            .contacts
            .iter()
            .map(|contact| (contact.id, render_message(&campaign, contact)))
            .collect();
        let outcomes = self.dispatch_all(campaign_id, messages).await;

        if let Some(err) = all_unavailable(&outcomes) {
            error!(campaign_id = %campaign_id, error = %err, "Transport unavailable for every recipient, campaign left sending");
            return Err(Error::TransportUnavailable(err));
        }

        let successful = outcomes.iter().filter(|(_, r)| r.is_ok()).count();
        let successful = u32::try_from(successful).unwrap_or(u32::MAX);
        let failed = total - successful;

        let completed_at = Utc::now().max(started_at);
        self.record_outcomes(campaign_id, &outcomes, completed_at).await?;

        if !self.db.complete_send(campaign_id, successful, completed_at).await? {
            let current = self.db.get_campaign(campaign_id).await?.map(|c| c.status);
            if let Some(status) = current {
                let refused = invalid_state(campaign_id, status, CampaignAction::Complete);
                warn!(campaign_id = %campaign_id, error = %refused, "Campaign left sending during dispatch, not marking completed");
            }
        }

        info!(campaign_id = %campaign_id, successful, failed, "Campaign send finished");
        Ok(DispatchReport {
            campaign_id,
            total_recipients: total,
            successful,
            failed,
        })
    }

    /// Contacts to send to: the enrolled ones, or everyone when nobody is.
    async fn resolve_recipients(&self, campaign: &Campaign) -> Result<Audience> {
        let enrolled = self.db.list_campaign_contacts(campaign.id).await?;
        let contacts = self.db.list_contacts(None).await?;

        if enrolled.is_empty() {
            info!(campaign_id = %campaign.id, count = contacts.len(), "No recipients enrolled, using all contacts");
            return Ok(Audience {
                needs_enrollment: !contacts.is_empty(),
                contacts,
            });
        }

        let mut by_id: HashMap<Uuid, Contact> = contacts.into_iter().map(|c| (c.id, c)).collect();
        let mut recipients = Vec::with_capacity(enrolled.len());
        for row in &enrolled {
            match by_id.remove(&row.contact_id) {
                Some(contact) => recipients.push(contact),
                None => warn!(
                    campaign_id = %campaign.id,
                    contact_id = %row.contact_id,
                    "Skipping recipient with missing or duplicate contact"
                ),
            }
        }
        Ok(Audience {
            contacts: recipients,
            needs_enrollment: false,
        })
    }

    /// Submit every message, at most `max_concurrent_sends` at once.
    async fn dispatch_all(
        &self,
        campaign_id: Uuid,
        messages: Vec<(Uuid, OutgoingEmail)>,
    ) -> Vec<RecipientOutcome> {
        let width = self.config.max_concurrent_sends.max(1);
        stream::iter(messages.into_iter().map(|(contact_id, email)| async move {
            let result = self.send_one(&email).await.map(|()| Utc::now());
            if let Err(e) = &result {
                warn!(campaign_id = %campaign_id, contact_id = %contact_id, error = %e, "Recipient send failed");
            }
            (contact_id, result)
        }))
        .buffer_unordered(width)
        .collect()
        .await
    }

    async fn send_one(&self, email: &OutgoingEmail) -> std::result::Result<(), TransportError> {
        let timeout = self.config.send_timeout;
        match tokio::time::timeout(timeout, self.transport.send(email)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                to: email.to.clone(),
                timeout,
            }),
        }
    }

    /// Write each recipient's final status. Every write is attempted; the
    /// first failure is returned after the unrecorded recipients are logged.
    async fn record_outcomes(
        &self,
        campaign_id: Uuid,
        outcomes: &[RecipientOutcome],
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        let writes = outcomes.iter().map(|(contact_id, result)| async move {
            let (status, at) = match result {
                Ok(sent_at) => (RecipientStatus::Sent, *sent_at),
                Err(_) => (RecipientStatus::Failed, completed_at),
            };
            let written = self
                .db
                .update_recipient_status(campaign_id, *contact_id, status, at)
                .await;
            (*contact_id, status, written)
        });

        let mut first_error = None;
        for (contact_id, status, written) in join_all(writes).await {
            if let Err(e) = written {
                error!(
                    campaign_id = %campaign_id,
                    contact_id = %contact_id,
                    status = %status,
                    error = %e,
                    "Recipient outcome not recorded"
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// The first error, if every attempt in a non-empty batch was unavailable-class.
fn all_unavailable(outcomes: &[RecipientOutcome]) -> Option<TransportError> {
    let mut first = None;
    for (_, result) in outcomes {
        match result {
            Err(e) if e.is_unavailable() => {
                first.get_or_insert_with(|| e.clone());
            }
            _ => return None,
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::campaigns::model::{CampaignContact, NewCampaign};
    use crate::contacts::NewContact;
    use crate::error::DatabaseError;
    use crate::store::LibSqlBackend;
    use crate::templates::EmailTemplate;

    /// Transport stub: rejects listed addresses, optionally simulates an outage.
    #[derive(Default)]
    struct StubTransport {
        reject: HashSet<String>,
        slow: HashSet<String>,
        delay: Duration,
        down: bool,
        health_down: bool,
        sent: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for StubTransport {
        fn name(&self) -> &str {
            "stub"
        }

        async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), TransportError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.slow.contains(&email.to) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.down {
                return Err(TransportError::Unavailable {
                    name: "stub".into(),
                    reason: "connection refused".into(),
                });
            }
            if self.reject.contains(&email.to) {
                return Err(TransportError::Rejected {
                    name: "stub".into(),
                    to: email.to.clone(),
                    reason: "550 mailbox unavailable".into(),
                });
            }
            self.sent.lock().unwrap().push(email.to.clone());
            Ok(())
        }

        async fn health_check(&self) -> std::result::Result<(), TransportError> {
            if self.health_down {
                Err(TransportError::Unavailable {
                    name: "stub".into(),
                    reason: "no route to host".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct Fixture {
        db: Arc<LibSqlBackend>,
        transport: Arc<StubTransport>,
        dispatcher: Dispatcher,
    }

    async fn fixture(transport: StubTransport) -> Fixture {
        fixture_with(transport, DispatchConfig::default()).await
    }

    async fn fixture_with(transport: StubTransport, config: DispatchConfig) -> Fixture {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(transport);
        let dispatcher = Dispatcher::new(db.clone(), transport.clone(), config);
        Fixture {
            db,
            transport,
            dispatcher,
        }
    }

    async fn add_campaign(db: &LibSqlBackend) -> Campaign {
        let campaign = NewCampaign {
            name: "Launch".into(),
            subject: "Hi {{name}}".into(),
            content: "<p>Hello {{name}}</p>".into(),
            from_name: "Acme".into(),
            from_email: "news@acme.test".into(),
        }
        .into_campaign();
        db.insert_campaign(&campaign).await.unwrap();
        campaign
    }

    async fn add_contacts(db: &LibSqlBackend, emails: &[&str]) -> Vec<Contact> {
        let mut out = Vec::new();
        for email in emails {
            let contact = NewContact::new(*email).with_name("Pat").into_contact();
            db.insert_contact(&contact).await.unwrap();
            out.push(contact);
        }
        out
    }

    fn ids(contacts: &[Contact]) -> Vec<Uuid> {
        contacts.iter().map(|c| c.id).collect()
    }

    async fn status_of(db: &LibSqlBackend, campaign_id: Uuid, contact_id: Uuid) -> RecipientStatus {
        db.list_campaign_contacts(campaign_id)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.contact_id == contact_id)
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn failures_are_attributed_to_their_own_recipient() {
        let transport = StubTransport {
            reject: ["b@x.test", "d@x.test"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let f = fixture(transport).await;
        let campaign = add_campaign(&f.db).await;
        let contacts = add_contacts(
            &f.db,
            &["a@x.test", "b@x.test", "c@x.test", "d@x.test", "e@x.test"],
        )
        .await;
        f.db.enroll_contacts(campaign.id, &ids(&contacts)).await.unwrap();

        let report = f.dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(
            report,
            DispatchReport {
                campaign_id: campaign.id,
                total_recipients: 5,
                successful: 3,
                failed: 2,
            }
        );

        let stored = f.db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
        assert_eq!(stored.total_recipients, 5);
        assert_eq!(stored.sent_count, 3);
        assert!(stored.completed_at.unwrap() >= stored.started_at.unwrap());

        for contact in &contacts {
            let expected = if contact.email == "b@x.test" || contact.email == "d@x.test" {
                RecipientStatus::Failed
            } else {
                RecipientStatus::Sent
            };
            assert_eq!(status_of(&f.db, campaign.id, contact.id).await, expected, "{}", contact.email);
        }
        let rows = f.db.list_campaign_contacts(campaign.id).await.unwrap();
        assert!(rows
            .iter()
            .filter(|r| r.status == RecipientStatus::Sent)
            .all(|r| r.sent_at.is_some()));
    }

    #[tokio::test]
    async fn completed_campaign_cannot_be_resent() {
        let f = fixture(StubTransport::default()).await;
        let campaign = add_campaign(&f.db).await;
        add_contacts(&f.db, &["a@x.test", "b@x.test"]).await;

        f.dispatcher.send_campaign(campaign.id).await.unwrap();
        let before = f.db.get_campaign(campaign.id).await.unwrap().unwrap();

        let err = f.dispatcher.send_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }), "{err}");

        let after = f.db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(after.status, CampaignStatus::Completed);
        assert_eq!(after.sent_count, before.sent_count);
        assert_eq!(after.total_recipients, before.total_recipients);
        assert_eq!(f.transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn unknown_campaign_is_not_found() {
        let f = fixture(StubTransport::default()).await;
        let err = f.dispatcher.send_campaign(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn unavailable_transport_leaves_campaign_sending() {
        let transport = StubTransport {
            down: true,
            ..Default::default()
        };
        let f = fixture(transport).await;
        let campaign = add_campaign(&f.db).await;
        let contacts = add_contacts(&f.db, &["a@x.test", "b@x.test"]).await;

        let err = f.dispatcher.send_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, Error::TransportUnavailable(_)), "{err}");

        let stored = f.db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Sending);
        assert_eq!(stored.sent_count, 0);
        for contact in &contacts {
            assert_eq!(status_of(&f.db, campaign.id, contact.id).await, RecipientStatus::Pending);
        }
    }

    #[tokio::test]
    async fn failed_health_check_aborts_before_any_send() {
        let transport = StubTransport {
            health_down: true,
            ..Default::default()
        };
        let f = fixture(transport).await;
        let campaign = add_campaign(&f.db).await;
        add_contacts(&f.db, &["a@x.test"]).await;

        let err = f.dispatcher.send_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, Error::TransportUnavailable(_)));
        assert!(f.transport.sent().is_empty());
        let stored = f.db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Sending);
    }

    #[tokio::test]
    async fn unenrolled_campaign_goes_to_every_contact() {
        let f = fixture(StubTransport::default()).await;
        let campaign = add_campaign(&f.db).await;
        add_contacts(&f.db, &["a@x.test", "b@x.test", "c@x.test"]).await;

        let report = f.dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(report.total_recipients, 3);
        assert_eq!(report.successful, 3);

        let rows = f.db.list_campaign_contacts(campaign.id).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.status == RecipientStatus::Sent));
    }

    #[tokio::test]
    async fn empty_audience_completes_with_zero_counts() {
        let f = fixture(StubTransport {
            down: true,
            ..Default::default()
        })
        .await;
        let campaign = add_campaign(&f.db).await;

        let report = f.dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(report.total_recipients, 0);
        assert_eq!(report.failed, 0);
        let stored = f.db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
    }

    #[tokio::test]
    async fn recipients_with_deleted_contacts_are_skipped() {
        let f = fixture(StubTransport::default()).await;
        let campaign = add_campaign(&f.db).await;
        let contacts = add_contacts(&f.db, &["a@x.test", "b@x.test"]).await;
        let ghost = Uuid::new_v4();
        let mut enroll = ids(&contacts);
        enroll.push(ghost);
        f.db.enroll_contacts(campaign.id, &enroll).await.unwrap();

        let report = f.dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(report.total_recipients, 2);
        assert_eq!(report.successful, 2);
        assert_eq!(status_of(&f.db, campaign.id, ghost).await, RecipientStatus::Pending);
    }

    #[tokio::test]
    async fn timed_out_recipient_counts_as_failed() {
        let transport = StubTransport {
            slow: ["slow@x.test".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let config = DispatchConfig {
            max_concurrent_sends: 4,
            send_timeout: Duration::from_millis(50),
        };
        let f = fixture_with(transport, config).await;
        let campaign = add_campaign(&f.db).await;
        let contacts = add_contacts(&f.db, &["fast@x.test", "slow@x.test"]).await;

        let report = f.dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(status_of(&f.db, campaign.id, contacts[1].id).await, RecipientStatus::Failed);
    }

    #[tokio::test]
    async fn concurrent_second_send_is_refused() {
        let transport = StubTransport {
            delay: Duration::from_millis(100),
            ..Default::default()
        };
        let f = fixture(transport).await;
        let campaign = add_campaign(&f.db).await;
        add_contacts(&f.db, &["a@x.test", "b@x.test"]).await;

        let (first, second) = tokio::join!(
            f.dispatcher.send_campaign(campaign.id),
            f.dispatcher.send_campaign(campaign.id)
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(Error::InvalidState { .. }))));
        assert_eq!(f.transport.sent().len(), 2);
    }

    /// What the store does behind the dispatcher's back.
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Interference {
        None,
        ClaimedElsewhere,
        DeletedBeforeClaim,
        RecipientWritesFail,
        PausedBeforeCompletion,
    }

    /// Delegates to a real store, interfering at one chosen point.
    struct InterferingDb {
        inner: Arc<LibSqlBackend>,
        interference: Interference,
    }

    #[async_trait]
    impl Database for InterferingDb {
        async fn run_migrations(&self) -> std::result::Result<(), DatabaseError> {
            self.inner.run_migrations().await
        }

        async fn insert_contact(&self, contact: &Contact) -> std::result::Result<(), DatabaseError> {
            self.inner.insert_contact(contact).await
        }

        async fn get_contact(&self, id: Uuid) -> std::result::Result<Option<Contact>, DatabaseError> {
            self.inner.get_contact(id).await
        }

        async fn list_contacts(
            &self,
            source_id: Option<&str>,
        ) -> std::result::Result<Vec<Contact>, DatabaseError> {
            self.inner.list_contacts(source_id).await
        }

        async fn delete_contact(&self, id: Uuid) -> std::result::Result<bool, DatabaseError> {
            self.inner.delete_contact(id).await
        }

        async fn replace_contacts_by_source(
            &self,
            source_id: &str,
            contacts: &[Contact],
        ) -> std::result::Result<usize, DatabaseError> {
            self.inner.replace_contacts_by_source(source_id, contacts).await
        }

        async fn insert_campaign(&self, campaign: &Campaign) -> std::result::Result<(), DatabaseError> {
            self.inner.insert_campaign(campaign).await
        }

        async fn get_campaign(&self, id: Uuid) -> std::result::Result<Option<Campaign>, DatabaseError> {
            self.inner.get_campaign(id).await
        }

        async fn list_campaigns(&self) -> std::result::Result<Vec<Campaign>, DatabaseError> {
            self.inner.list_campaigns().await
        }

        async fn update_campaign(&self, campaign: &Campaign) -> std::result::Result<bool, DatabaseError> {
            self.inner.update_campaign(campaign).await
        }

        async fn delete_campaign(&self, id: Uuid) -> std::result::Result<bool, DatabaseError> {
            self.inner.delete_campaign(id).await
        }

        async fn schedule_campaign(
            &self,
            id: Uuid,
            at: DateTime<Utc>,
        ) -> std::result::Result<bool, DatabaseError> {
            self.inner.schedule_campaign(id, at).await
        }

        async fn pause_campaign(&self, id: Uuid) -> std::result::Result<bool, DatabaseError> {
            self.inner.pause_campaign(id).await
        }

        async fn begin_send(
            &self,
            id: Uuid,
            total_recipients: u32,
            started_at: DateTime<Utc>,
        ) -> std::result::Result<bool, DatabaseError> {
            match self.interference {
                Interference::ClaimedElsewhere => {
                    self.inner.begin_send(id, 0, started_at).await?;
                }
                Interference::DeletedBeforeClaim => {
                    self.inner.delete_campaign(id).await?;
                }
                _ => {}
            }
            self.inner.begin_send(id, total_recipients, started_at).await
        }

        async fn complete_send(
            &self,
            id: Uuid,
            sent_count: u32,
            completed_at: DateTime<Utc>,
        ) -> std::result::Result<bool, DatabaseError> {
            if self.interference == Interference::PausedBeforeCompletion {
                self.inner.pause_campaign(id).await?;
            }
            self.inner.complete_send(id, sent_count, completed_at).await
        }

        async fn list_campaign_contacts(
            &self,
            campaign_id: Uuid,
        ) -> std::result::Result<Vec<CampaignContact>, DatabaseError> {
            self.inner.list_campaign_contacts(campaign_id).await
        }

        async fn enroll_contacts(
            &self,
            campaign_id: Uuid,
            contact_ids: &[Uuid],
        ) -> std::result::Result<Vec<CampaignContact>, DatabaseError> {
            self.inner.enroll_contacts(campaign_id, contact_ids).await
        }

        async fn update_recipient_status(
            &self,
            campaign_id: Uuid,
            contact_id: Uuid,
            status: RecipientStatus,
            at: DateTime<Utc>,
        ) -> std::result::Result<bool, DatabaseError> {
            if self.interference == Interference::RecipientWritesFail {
                return Err(DatabaseError::Query("disk I/O error".into()));
            }
            self.inner
                .update_recipient_status(campaign_id, contact_id, status, at)
                .await
        }

        async fn insert_template(&self, template: &EmailTemplate) -> std::result::Result<(), DatabaseError> {
            self.inner.insert_template(template).await
        }

        async fn get_template(&self, id: Uuid) -> std::result::Result<Option<EmailTemplate>, DatabaseError> {
            self.inner.get_template(id).await
        }

        async fn list_templates(&self) -> std::result::Result<Vec<EmailTemplate>, DatabaseError> {
            self.inner.list_templates().await
        }

        async fn update_template(&self, template: &EmailTemplate) -> std::result::Result<bool, DatabaseError> {
            self.inner.update_template(template).await
        }

        async fn delete_template(&self, id: Uuid) -> std::result::Result<bool, DatabaseError> {
            self.inner.delete_template(id).await
        }
    }

    async fn interfering(interference: Interference) -> (Arc<LibSqlBackend>, Dispatcher) {
        let inner = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let db = Arc::new(InterferingDb {
            inner: inner.clone(),
            interference,
        });
        let dispatcher = Dispatcher::new(db, Arc::new(StubTransport::default()), DispatchConfig::default());
        (inner, dispatcher)
    }

    #[tokio::test]
    async fn refused_claim_leaves_no_enrollment_behind() {
        let (db, dispatcher) = interfering(Interference::ClaimedElsewhere).await;
        let campaign = add_campaign(&db).await;
        add_contacts(&db, &["a@x.test", "b@x.test"]).await;

        let err = dispatcher.send_campaign(campaign.id).await.unwrap_err();
        match err {
            Error::InvalidState { state, action, .. } => {
                assert_eq!(state, "sending");
                assert_eq!(action, "send");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(db.list_campaign_contacts(campaign.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn campaign_deleted_before_claim_is_not_found() {
        let (db, dispatcher) = interfering(Interference::DeletedBeforeClaim).await;
        let campaign = add_campaign(&db).await;
        add_contacts(&db, &["a@x.test"]).await;

        let err = dispatcher.send_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");
        assert!(db.list_campaign_contacts(campaign.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrecorded_outcomes_keep_campaign_sending() {
        let (db, dispatcher) = interfering(Interference::RecipientWritesFail).await;
        let campaign = add_campaign(&db).await;
        add_contacts(&db, &["a@x.test", "b@x.test"]).await;

        let err = dispatcher.send_campaign(campaign.id).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)), "{err}");

        let stored = db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Sending);
        assert!(stored.completed_at.is_none());
    }

    #[tokio::test]
    async fn campaign_paused_mid_send_stays_paused_with_outcomes_recorded() {
        let (db, dispatcher) = interfering(Interference::PausedBeforeCompletion).await;
        let campaign = add_campaign(&db).await;
        let contacts = add_contacts(&db, &["a@x.test", "b@x.test"]).await;

        let report = dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(report.successful, 2);

        let stored = db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Paused);
        assert!(stored.completed_at.is_none());
        for contact in &contacts {
            assert_eq!(status_of(&db, campaign.id, contact.id).await, RecipientStatus::Sent);
        }
    }

    #[tokio::test]
    async fn undisturbed_store_completes_normally() {
        let (db, dispatcher) = interfering(Interference::None).await;
        let campaign = add_campaign(&db).await;
        add_contacts(&db, &["a@x.test"]).await;

        let report = dispatcher.send_campaign(campaign.id).await.unwrap();
        assert_eq!(report.successful, 1);
        let stored = db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Completed);
    }

    #[test]
    fn mixed_outcomes_are_not_an_outage() {
        let down = TransportError::Unavailable {
            name: "stub".into(),
            reason: "refused".into(),
        };
        let outcomes: Vec<RecipientOutcome> = vec![
            (Uuid::new_v4(), Err(down.clone())),
            (Uuid::new_v4(), Ok(Utc::now())),
        ];
        assert!(all_unavailable(&outcomes).is_none());
        assert!(all_unavailable(&[]).is_none());
        assert!(all_unavailable(&outcomes[..1]).is_some());
    }
}
