//! SQLite persistence for normalized email records.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::normalize::EmailRecord;

/// Schema DDL, safe to run on every open.
///
/// `message_id` is NULL for messages without a reliable natural key. SQLite
/// unique indexes do not compare NULLs, so keyless rows duplicate freely
/// while non-empty keys are deduplicated.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS emails (
    id INTEGER PRIMARY KEY,
    message_id TEXT,
    date_iso TEXT,          -- ISO-8601 in UTC
    date_day TEXT,          -- YYYY-MM-DD (UTC)
    from_addr TEXT,
    to_addr TEXT,
    cc_addr TEXT,
    subject TEXT,
    body_preview TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_emails_message_id ON emails(message_id);

CREATE INDEX IF NOT EXISTS idx_emails_date_day ON emails(date_day);
CREATE INDEX IF NOT EXISTS idx_emails_from ON emails(from_addr);
CREATE INDEX IF NOT EXISTS idx_emails_to ON emails(to_addr);
CREATE INDEX IF NOT EXISTS idx_emails_subject ON emails(subject);
";

/// Destination store: one exclusively-owned SQLite connection.
pub struct EmailStore {
    conn: Connection,
    path: PathBuf,
}

impl EmailStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!(path = %path.display(), "Opened store");
        Ok(Self { conn, path })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Idempotently create the `emails` table and its indexes.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        info!(path = %self.path.display(), "Schema ensured");
        Ok(())
    }

    /// Insert a batch of records in a single transaction.
    ///
    /// Records with a non-empty `message_id` use `INSERT OR IGNORE`; a
    /// silently ignored duplicate counts as skipped. Records with an empty
    /// `message_id` are inserted unconditionally with a NULL key. Any
    /// per-row failure is logged, counted as skipped, and does not roll back
    /// rows that succeeded.
    ///
    /// Returns `(inserted, skipped)` for this batch.
    pub fn insert_batch(&mut self, records: &[EmailRecord]) -> Result<(u64, u64)> {
        let tx = self.conn.transaction()?;
        let mut inserted: u64 = 0;
        let mut skipped: u64 = 0;

        {
            let mut insert_keyed = tx.prepare(
                "INSERT OR IGNORE INTO emails
                 (message_id, date_iso, date_day, from_addr, to_addr, cc_addr, subject, body_preview)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut insert_keyless = tx.prepare(
                "INSERT INTO emails
                 (message_id, date_iso, date_day, from_addr, to_addr, cc_addr, subject, body_preview)
                 VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for rec in records {
                let result = if rec.message_id.is_empty() {
                    insert_keyless.execute(params![
                        rec.date_iso,
                        rec.date_day,
                        rec.from_addr,
                        rec.to_addr,
                        rec.cc_addr,
                        rec.subject,
                        rec.body_preview,
                    ])
                } else {
                    insert_keyed.execute(params![
                        rec.message_id,
                        rec.date_iso,
                        rec.date_day,
                        rec.from_addr,
                        rec.to_addr,
                        rec.cc_addr,
                        rec.subject,
                        rec.body_preview,
                    ])
                };

                match result {
                    // INSERT OR IGNORE reporting zero changed rows: duplicate key
                    Ok(0) => {
                        debug!(message_id = %rec.message_id, "Duplicate message, skipping");
                        skipped += 1;
                    }
                    Ok(_) => inserted += 1,
                    Err(e) => {
                        warn!(message_id = %rec.message_id, error = %e, "Skipping row");
                        skipped += 1;
                    }
                }
            }
        }

        tx.commit()?;
        Ok((inserted, skipped))
    }
}
