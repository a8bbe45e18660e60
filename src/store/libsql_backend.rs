//! libSQL implementation of the campaign store.
//!
//! Lifecycle writes are conditional on the current status, so a refused
//! transition shows up as `Ok(false)` rather than a silent overwrite.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::campaigns::model::{Campaign, CampaignContact, CampaignStatus, RecipientStatus};
use crate::contacts::{Contact, CustomFields};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::templates::EmailTemplate;

/// One shared connection over a local file or in-memory database.
pub struct LibSqlBackend {
    /// Held so the database outlives the connection.
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Mutex<Connection>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Lock the connection. Held for a whole transaction so statements
    /// from other requests cannot interleave with it.
    async fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical write format. Fixed precision keeps text ordering chronological.
fn fmt_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}

/// Convert an optional timestamp to a libsql Value.
fn opt_datetime(dt: Option<&DateTime<Utc>>) -> libsql::Value {
    match dt {
        Some(dt) => libsql::Value::Text(fmt_datetime(dt)),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn get_text(row: &libsql::Row, idx: i32, what: &str) -> Result<String, DatabaseError> {
    row.get::<String>(idx)
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))
}

fn get_opt_text(row: &libsql::Row, idx: i32, what: &str) -> Result<Option<String>, DatabaseError> {
    row.get::<Option<String>>(idx)
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))
}

fn get_uuid(row: &libsql::Row, idx: i32, what: &str) -> Result<Uuid, DatabaseError> {
    let raw = get_text(row, idx, what)?;
    Uuid::parse_str(&raw).map_err(|e| DatabaseError::Serialization(format!("{what} parse: {e}")))
}

fn get_count(row: &libsql::Row, idx: i32, what: &str) -> Result<u32, DatabaseError> {
    let n = row
        .get::<i64>(idx)
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))?;
    u32::try_from(n.max(0)).map_err(|e| DatabaseError::Serialization(format!("{what}: {e}")))
}

const CONTACT_COLUMNS: &str = "id, email, name, custom_fields, source_id, created_at";

/// Column order matches CONTACT_COLUMNS.
fn row_to_contact(row: &libsql::Row) -> Result<Contact, DatabaseError> {
    let fields_json = get_text(row, 3, "contact.custom_fields")?;
    let custom_fields: CustomFields = serde_json::from_str(&fields_json)
        .map_err(|e| DatabaseError::Serialization(format!("contact.custom_fields: {e}")))?;
    let created = get_text(row, 5, "contact.created_at")?;

    Ok(Contact {
        id: get_uuid(row, 0, "contact.id")?,
        email: get_text(row, 1, "contact.email")?,
        name: get_opt_text(row, 2, "contact.name")?,
        custom_fields,
        source_id: get_opt_text(row, 4, "contact.source_id")?,
        created_at: parse_datetime(&created),
    })
}

const CAMPAIGN_COLUMNS: &str = "id, name, subject, content, from_name, from_email, status, \
     total_recipients, sent_count, open_count, click_count, bounce_count, \
     scheduled_at, started_at, completed_at, created_at, updated_at";

/// Column order matches CAMPAIGN_COLUMNS.
fn row_to_campaign(row: &libsql::Row) -> Result<Campaign, DatabaseError> {
    let status_str = get_text(row, 6, "campaign.status")?;
    let status: CampaignStatus = status_str.parse().map_err(DatabaseError::Serialization)?;
    let created = get_text(row, 15, "campaign.created_at")?;
    let updated = get_text(row, 16, "campaign.updated_at")?;

    Ok(Campaign {
        id: get_uuid(row, 0, "campaign.id")?,
        name: get_text(row, 1, "campaign.name")?,
        subject: get_text(row, 2, "campaign.subject")?,
        content: get_text(row, 3, "campaign.content")?,
        from_name: get_text(row, 4, "campaign.from_name")?,
        from_email: get_text(row, 5, "campaign.from_email")?,
        status,
        total_recipients: get_count(row, 7, "campaign.total_recipients")?,
        sent_count: get_count(row, 8, "campaign.sent_count")?,
        open_count: get_count(row, 9, "campaign.open_count")?,
        click_count: get_count(row, 10, "campaign.click_count")?,
        bounce_count: get_count(row, 11, "campaign.bounce_count")?,
        scheduled_at: parse_optional_datetime(get_opt_text(row, 12, "campaign.scheduled_at")?),
        started_at: parse_optional_datetime(get_opt_text(row, 13, "campaign.started_at")?),
        completed_at: parse_optional_datetime(get_opt_text(row, 14, "campaign.completed_at")?),
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

const RECIPIENT_COLUMNS: &str = "id, campaign_id, contact_id, status, sent_at, opened_at, clicked_at";

/// Column order matches RECIPIENT_COLUMNS.
fn row_to_recipient(row: &libsql::Row) -> Result<CampaignContact, DatabaseError> {
    let status_str = get_text(row, 3, "recipient.status")?;
    let status: RecipientStatus = status_str.parse().map_err(DatabaseError::Serialization)?;

    Ok(CampaignContact {
        id: get_uuid(row, 0, "recipient.id")?,
        campaign_id: get_uuid(row, 1, "recipient.campaign_id")?,
        contact_id: get_uuid(row, 2, "recipient.contact_id")?,
        status,
        sent_at: parse_optional_datetime(get_opt_text(row, 4, "recipient.sent_at")?),
        opened_at: parse_optional_datetime(get_opt_text(row, 5, "recipient.opened_at")?),
        clicked_at: parse_optional_datetime(get_opt_text(row, 6, "recipient.clicked_at")?),
    })
}

const TEMPLATE_COLUMNS: &str = "id, name, subject, content, created_at, updated_at";

/// Column order matches TEMPLATE_COLUMNS.
fn row_to_template(row: &libsql::Row) -> Result<EmailTemplate, DatabaseError> {
    let created = get_text(row, 4, "template.created_at")?;
    let updated = get_text(row, 5, "template.updated_at")?;

    Ok(EmailTemplate {
        id: get_uuid(row, 0, "template.id")?,
        name: get_text(row, 1, "template.name")?,
        subject: get_text(row, 2, "template.subject")?,
        content: get_text(row, 3, "template.content")?,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

/// Drain `rows` through `map`, failing on the first bad row.
async fn collect_rows<T>(
    mut rows: libsql::Rows,
    what: &str,
    map: fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{what}: {e}")))?
    {
        out.push(map(&row)?);
    }
    Ok(out)
}

async fn insert_contact_on(conn: &Connection, contact: &Contact) -> Result<(), DatabaseError> {
    let fields_json = serde_json::to_string(&contact.custom_fields)
        .map_err(|e| DatabaseError::Serialization(format!("contact.custom_fields: {e}")))?;

    conn.execute(
        &format!("INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![
            contact.id.to_string(),
            contact.email.as_str(),
            opt_text(contact.name.as_deref()),
            fields_json,
            opt_text(contact.source_id.as_deref()),
            fmt_datetime(&contact.created_at),
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_contact: {e}")))?;
    Ok(())
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(&*self.conn().await).await
    }

    // ── Contacts ────────────────────────────────────────────────────

    async fn insert_contact(&self, contact: &Contact) -> Result<(), DatabaseError> {
        insert_contact_on(&*self.conn().await, contact).await?;
        debug!(contact_id = %contact.id, "Contact inserted");
        Ok(())
    }

    async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError> {
        let conn = self.conn().await;
        let mut rows = conn
            .query(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_contact: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_contact(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_contact: {e}"))),
        }
    }

    async fn list_contacts(&self, source_id: Option<&str>) -> Result<Vec<Contact>, DatabaseError> {
        let conn = self.conn().await;
        let rows = match source_id {
            Some(source_id) => {
                conn.query(
                    &format!(
                        "SELECT {CONTACT_COLUMNS} FROM contacts WHERE source_id = ?1 ORDER BY created_at ASC, rowid ASC"
                    ),
                    params![source_id],
                )
                .await
            }
            None => {
                conn.query(
                    &format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at ASC, rowid ASC"),
                    (),
                )
                .await
            }
        }
        .map_err(|e| DatabaseError::Query(format!("list_contacts: {e}")))?;

        collect_rows(rows, "list_contacts", row_to_contact).await
    }

    async fn delete_contact(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute("DELETE FROM contacts WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_contact: {e}")))?;
        Ok(count > 0)
    }

    async fn replace_contacts_by_source(
        &self,
        source_id: &str,
        contacts: &[Contact],
    ) -> Result<usize, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("replace_contacts_by_source begin: {e}")))?;

        let removed = tx
            .execute("DELETE FROM contacts WHERE source_id = ?1", params![source_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("replace_contacts_by_source delete: {e}")))?;

        for contact in contacts {
            insert_contact_on(&tx, contact).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("replace_contacts_by_source commit: {e}")))?;

        debug!(source_id, removed, inserted = contacts.len(), "Contacts replaced by source");
        Ok(removed as usize)
    }

    // ── Campaigns ───────────────────────────────────────────────────

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), DatabaseError> {
        self.conn()
            .await
            .execute(
                &format!(
                    "INSERT INTO campaigns ({CAMPAIGN_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
                ),
                params![
                    campaign.id.to_string(),
                    campaign.name.as_str(),
                    campaign.subject.as_str(),
                    campaign.content.as_str(),
                    campaign.from_name.as_str(),
                    campaign.from_email.as_str(),
                    campaign.status.as_str(),
                    i64::from(campaign.total_recipients),
                    i64::from(campaign.sent_count),
                    i64::from(campaign.open_count),
                    i64::from(campaign.click_count),
                    i64::from(campaign.bounce_count),
                    opt_datetime(campaign.scheduled_at.as_ref()),
                    opt_datetime(campaign.started_at.as_ref()),
                    opt_datetime(campaign.completed_at.as_ref()),
                    fmt_datetime(&campaign.created_at),
                    fmt_datetime(&campaign.updated_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_campaign: {e}")))?;

        debug!(campaign_id = %campaign.id, "Campaign inserted");
        Ok(())
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, DatabaseError> {
        let conn = self.conn().await;
        let mut rows = conn
            .query(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_campaign: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_campaign(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_campaign: {e}"))),
        }
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, DatabaseError> {
        let conn = self.conn().await;
        let rows = conn
            .query(
                &format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC, rowid DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_campaigns: {e}")))?;

        collect_rows(rows, "list_campaigns", row_to_campaign).await
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "UPDATE campaigns SET name = ?1, subject = ?2, content = ?3, from_name = ?4, \
                 from_email = ?5, updated_at = ?6 WHERE id = ?7 AND status != 'sending'",
                params![
                    campaign.name.as_str(),
                    campaign.subject.as_str(),
                    campaign.content.as_str(),
                    campaign.from_name.as_str(),
                    campaign.from_email.as_str(),
                    fmt_datetime(&campaign.updated_at),
                    campaign.id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_campaign: {e}")))?;
        Ok(count > 0)
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_campaign begin: {e}")))?;

        let count = tx
            .execute(
                "DELETE FROM campaigns WHERE id = ?1 AND status != 'sending'",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_campaign: {e}")))?;

        if count > 0 {
            tx.execute(
                "DELETE FROM campaign_contacts WHERE campaign_id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_campaign recipients: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_campaign commit: {e}")))?;
        Ok(count > 0)
    }

    async fn schedule_campaign(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "UPDATE campaigns SET status = 'scheduled', scheduled_at = ?1, updated_at = ?2 \
                 WHERE id = ?3 AND status IN ('draft', 'scheduled')",
                params![fmt_datetime(&at), fmt_datetime(&Utc::now()), id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("schedule_campaign: {e}")))?;
        Ok(count > 0)
    }

    async fn pause_campaign(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "UPDATE campaigns SET status = 'paused', updated_at = ?1 \
                 WHERE id = ?2 AND status = 'sending'",
                params![fmt_datetime(&Utc::now()), id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("pause_campaign: {e}")))?;
        Ok(count > 0)
    }

    async fn begin_send(
        &self,
        id: Uuid,
        total_recipients: u32,
        started_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "UPDATE campaigns SET status = 'sending', total_recipients = ?1, started_at = ?2, \
                 updated_at = ?2 WHERE id = ?3 AND status IN ('draft', 'scheduled')",
                params![
                    i64::from(total_recipients),
                    fmt_datetime(&started_at),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("begin_send: {e}")))?;
        Ok(count > 0)
    }

    async fn complete_send(
        &self,
        id: Uuid,
        sent_count: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "UPDATE campaigns SET status = 'completed', sent_count = ?1, completed_at = ?2, \
                 updated_at = ?2 WHERE id = ?3 AND status = 'sending'",
                params![
                    i64::from(sent_count),
                    fmt_datetime(&completed_at),
                    id.to_string()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("complete_send: {e}")))?;
        Ok(count > 0)
    }

    // ── Recipients ──────────────────────────────────────────────────

    async fn list_campaign_contacts(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<CampaignContact>, DatabaseError> {
        let conn = self.conn().await;
        let rows = conn
            .query(
                &format!(
                    "SELECT {RECIPIENT_COLUMNS} FROM campaign_contacts WHERE campaign_id = ?1 ORDER BY rowid ASC"
                ),
                params![campaign_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_campaign_contacts: {e}")))?;

        collect_rows(rows, "list_campaign_contacts", row_to_recipient).await
    }

    async fn enroll_contacts(
        &self,
        campaign_id: Uuid,
        contact_ids: &[Uuid],
    ) -> Result<Vec<CampaignContact>, DatabaseError> {
        let conn = self.conn().await;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("enroll_contacts begin: {e}")))?;

        let mut enrolled = Vec::with_capacity(contact_ids.len());
        for contact_id in contact_ids {
            let row = CampaignContact::new(campaign_id, *contact_id);
            tx.execute(
                &format!(
                    "INSERT INTO campaign_contacts ({RECIPIENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, NULL, NULL, NULL)"
                ),
                params![
                    row.id.to_string(),
                    campaign_id.to_string(),
                    contact_id.to_string(),
                    row.status.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("enroll_contacts: {e}")))?;
            enrolled.push(row);
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("enroll_contacts commit: {e}")))?;

        debug!(campaign_id = %campaign_id, count = enrolled.len(), "Contacts enrolled");
        Ok(enrolled)
    }

    async fn update_recipient_status(
        &self,
        campaign_id: Uuid,
        contact_id: Uuid,
        status: RecipientStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let column = match status {
            RecipientStatus::Sent => Some("sent_at"),
            RecipientStatus::Opened => Some("opened_at"),
            RecipientStatus::Clicked => Some("clicked_at"),
            RecipientStatus::Pending | RecipientStatus::Failed | RecipientStatus::Bounced => None,
        };

        let conn = self.conn().await;
        let result = match column {
            Some(column) => {
                conn.execute(
                    &format!(
                        "UPDATE campaign_contacts SET status = ?1, {column} = ?2 \
                         WHERE campaign_id = ?3 AND contact_id = ?4"
                    ),
                    params![
                        status.as_str(),
                        fmt_datetime(&at),
                        campaign_id.to_string(),
                        contact_id.to_string()
                    ],
                )
                .await
            }
            None => {
                conn.execute(
                    "UPDATE campaign_contacts SET status = ?1 WHERE campaign_id = ?2 AND contact_id = ?3",
                    params![status.as_str(), campaign_id.to_string(), contact_id.to_string()],
                )
                .await
            }
        };

        let count =
            result.map_err(|e| DatabaseError::Query(format!("update_recipient_status: {e}")))?;
        Ok(count > 0)
    }

    // ── Templates ───────────────────────────────────────────────────

    async fn insert_template(&self, template: &EmailTemplate) -> Result<(), DatabaseError> {
        self.conn()
            .await
            .execute(
                &format!("INSERT INTO email_templates ({TEMPLATE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    template.id.to_string(),
                    template.name.as_str(),
                    template.subject.as_str(),
                    template.content.as_str(),
                    fmt_datetime(&template.created_at),
                    fmt_datetime(&template.updated_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_template: {e}")))?;
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<EmailTemplate>, DatabaseError> {
        let conn = self.conn().await;
        let mut rows = conn
            .query(
                &format!("SELECT {TEMPLATE_COLUMNS} FROM email_templates WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_template: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_template(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_template: {e}"))),
        }
    }

    async fn list_templates(&self) -> Result<Vec<EmailTemplate>, DatabaseError> {
        let conn = self.conn().await;
        let rows = conn
            .query(
                &format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM email_templates ORDER BY updated_at DESC, rowid DESC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_templates: {e}")))?;

        collect_rows(rows, "list_templates", row_to_template).await
    }

    async fn update_template(&self, template: &EmailTemplate) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "UPDATE email_templates SET name = ?1, subject = ?2, content = ?3, updated_at = ?4 \
                 WHERE id = ?5",
                params![
                    template.name.as_str(),
                    template.subject.as_str(),
                    template.content.as_str(),
                    fmt_datetime(&template.updated_at),
                    template.id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_template: {e}")))?;
        Ok(count > 0)
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .await
            .execute(
                "DELETE FROM email_templates WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_template: {e}")))?;
        Ok(count > 0)
    }
}
