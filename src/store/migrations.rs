//! Schema migrations for the campaign store.
//!
//! Versions are tracked in `_migrations`; only steps newer than the
//! recorded version are applied, in order.

use libsql::Connection;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Append only; versions must increase.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT,
                custom_fields TEXT NOT NULL DEFAULT '{}',
                source_id TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_contacts_source ON contacts(source_id);
            CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts(email);

            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                subject TEXT NOT NULL,
                content TEXT NOT NULL,
                from_name TEXT NOT NULL,
                from_email TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                total_recipients INTEGER NOT NULL DEFAULT 0,
                sent_count INTEGER NOT NULL DEFAULT 0,
                open_count INTEGER NOT NULL DEFAULT 0,
                click_count INTEGER NOT NULL DEFAULT 0,
                bounce_count INTEGER NOT NULL DEFAULT 0,
                scheduled_at TEXT,
                started_at TEXT,
                completed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status);
            CREATE INDEX IF NOT EXISTS idx_campaigns_created ON campaigns(created_at);

            CREATE TABLE IF NOT EXISTS campaign_contacts (
                id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
                contact_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                sent_at TEXT,
                opened_at TEXT,
                clicked_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_campaign_contacts_campaign
                ON campaign_contacts(campaign_id);
            CREATE INDEX IF NOT EXISTS idx_campaign_contacts_contact
                ON campaign_contacts(contact_id);
        "#,
    },
    Migration {
        version: 2,
        name: "email_templates",
        sql: r#"
            CREATE TABLE IF NOT EXISTS email_templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                subject TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_email_templates_updated ON email_templates(updated_at);
        "#,
    },
];

const SCHEMA_VERSION_DDL: &str = "CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

/// Bring the schema up to the latest version.
///
/// Each pending step runs in its own transaction together with its
/// `_migrations` row, so a failed step leaves the previous version intact.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(SCHEMA_VERSION_DDL, ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let from = current_version(conn).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        tracing::debug!(version = from, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        let failed = |e: libsql::Error| {
            DatabaseError::Migration(format!(
                "V{} ({}) failed: {e}",
                migration.version, migration.name
            ))
        };
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");

        let tx = conn.transaction().await.map_err(failed)?;
        tx.execute_batch(migration.sql).await.map_err(failed)?;
        record_version(&tx, migration.version, migration.name).await?;
        tx.commit().await.map_err(failed)?;
    }

    let to = current_version(conn).await?;
    tracing::info!(from, to, "Schema migrated");
    Ok(())
}

/// Highest applied version, 0 on a fresh database.
async fn current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query schema version: {e}")))?;

    let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read schema version: {e}")))?
    else {
        return Ok(0);
    };
    row.get::<i64>(0)
        .map_err(|e| DatabaseError::Migration(format!("Bad schema version: {e}")))
}

async fn record_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record V{version}: {e}")))?;
    Ok(())
}
