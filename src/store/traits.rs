//! Unified `Database` trait — single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::campaigns::model::{Campaign, CampaignContact, RecipientStatus};
use crate::contacts::Contact;
use crate::error::DatabaseError;
use crate::templates::EmailTemplate;

/// Backend-agnostic database trait covering contacts, campaigns, recipients
/// and templates.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Contacts ────────────────────────────────────────────────────

    async fn insert_contact(&self, contact: &Contact) -> Result<(), DatabaseError>;

    async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError>;

    /// List contacts in creation order, optionally only those from one source.
    async fn list_contacts(&self, source_id: Option<&str>) -> Result<Vec<Contact>, DatabaseError>;

    async fn delete_contact(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Delete every contact carrying `source_id` and insert `contacts`, in
    /// one transaction. Returns how many contacts were removed.
    async fn replace_contacts_by_source(
        &self,
        source_id: &str,
        contacts: &[Contact],
    ) -> Result<usize, DatabaseError>;

    // ── Campaigns ───────────────────────────────────────────────────

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), DatabaseError>;

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, DatabaseError>;

    /// All campaigns, newest first.
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, DatabaseError>;

    /// Persist the editable content fields of `campaign`.
    ///
    /// Refused (returns false) when the stored campaign is missing or sending.
    async fn update_campaign(&self, campaign: &Campaign) -> Result<bool, DatabaseError>;

    /// Delete a campaign and its recipient rows. Refused while sending.
    async fn delete_campaign(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Move a draft or scheduled campaign to `scheduled`.
    async fn schedule_campaign(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError>;

    /// Move a sending campaign to `paused`.
    async fn pause_campaign(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Claim a draft or scheduled campaign for sending: status `sending`,
    /// `started_at` and `total_recipients` are written together.
    ///
    /// Returns false when the campaign is no longer in a sendable status.
    async fn begin_send(
        &self,
        id: Uuid,
        total_recipients: u32,
        started_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Close out a sending campaign with its final sent count.
    async fn complete_send(
        &self,
        id: Uuid,
        sent_count: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    // ── Recipients ──────────────────────────────────────────────────

    async fn list_campaign_contacts(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<CampaignContact>, DatabaseError>;

    /// Create a pending recipient row for each contact id.
    ///
    /// No duplicate check; callers decide which contacts to enroll.
    async fn enroll_contacts(
        &self,
        campaign_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<CampaignContact>, DatabaseError>;

    /// Set a recipient's status, stamping `sent_at`, `opened_at` or
    /// `clicked_at` for the matching status.
    async fn update_recipient_status(
        &self,
        campaign_id: Uuid,
        contact_id: Uuid,
        status: RecipientStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    // ── Templates ───────────────────────────────────────────────────

    async fn insert_template(&self, template: &EmailTemplate) -> Result<(), DatabaseError>;

    async fn get_template(&self, id: Uuid) -> Result<Option<EmailTemplate>, DatabaseError>;

    /// All templates, most recently updated first.
    async fn list_templates(&self) -> Result<Vec<EmailTemplate>, DatabaseError>;

    async fn update_template(&self, template: &EmailTemplate) -> Result<bool, DatabaseError>;

    async fn delete_template(&self, id: Uuid) -> Result<bool, DatabaseError>;
}
