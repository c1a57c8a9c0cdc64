//! Outbox storage.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;

use super::model::{OutboundMail, OutboxItem, OutboxStatus};
use crate::Result;
use crate::store::{format_timestamp, parse_timestamp};

pub(crate) const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS outbox (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purpose TEXT NOT NULL,
        payload TEXT NOT NULL,
        bulk INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending',
        attempts INTEGER NOT NULL DEFAULT 0,
        last_error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_outbox_pending ON outbox(status, bulk, id)
    ",
];

/// Repository for queued outbound mail.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Queues a mail on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the mail cannot be serialized or stored.
    pub async fn enqueue(conn: &mut SqliteConnection, mail: &OutboundMail) -> Result<i64> {
        let now = format_timestamp(Utc::now());
        let result = sqlx::query(
            r"
            INSERT INTO outbox (purpose, payload, bulk, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(mail.purpose.as_str())
        .bind(serde_json::to_string(mail)?)
        .bind(mail.bulk)
        .bind(OutboxStatus::Pending.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Pending mail, non-bulk first, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a payload is corrupt.
    pub async fn pending(&self, limit: u32) -> Result<Vec<OutboxItem>> {
        let rows = sqlx::query(
            "SELECT * FROM outbox WHERE status = ? ORDER BY bulk ASC, id ASC LIMIT ?",
        )
        .bind(OutboxStatus::Pending.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    /// Every item, optionally filtered by status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a payload is corrupt.
    pub async fn list(&self, status: Option<OutboxStatus>) -> Result<Vec<OutboxItem>> {
        let rows = sqlx::query("SELECT * FROM outbox WHERE (? IS NULL OR status = ?) ORDER BY id ASC")
            .bind(status.map(OutboxStatus::as_str))
            .bind(status.map(OutboxStatus::as_str))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_item).collect()
    }

    /// Number of items in a status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, status: OutboxStatus) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Marks an item delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_sent(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE outbox SET status = ?, attempts = attempts + 1, last_error = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(OutboxStatus::Sent.as_str())
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Records a failed attempt. The item fails for good once it has been
    /// tried `max_attempts` times; the resulting status is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record_failure(
        &self,
        id: i64,
        error: &str,
        max_attempts: u32,
    ) -> Result<OutboxStatus> {
        let row = sqlx::query(
            r"
            UPDATE outbox SET
                attempts = attempts + 1,
                last_error = ?,
                status = CASE WHEN attempts + 1 >= ? THEN ? ELSE status END,
                updated_at = ?
            WHERE id = ?
            RETURNING status
            ",
        )
        .bind(error)
        .bind(i64::from(max_attempts))
        .bind(OutboxStatus::Failed.as_str())
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxStatus::from_db(row.get("status")))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_item(row: &SqliteRow) -> Result<OutboxItem> {
    Ok(OutboxItem {
        id: row.get("id"),
        mail: serde_json::from_str(row.get("payload"))?,
        status: OutboxStatus::from_db(row.get("status")),
        attempts: row.get::<i64, _>("attempts") as u32,
        last_error: row.get("last_error"),
        created_at: parse_timestamp(row.get("created_at")),
    })
}
