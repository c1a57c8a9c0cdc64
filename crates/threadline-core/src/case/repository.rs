//! Case storage.
//!
//! Reads go through the pool. Writes that belong to one message's
//! ingestion take a `&mut SqliteConnection` so they can run inside the
//! caller's transaction.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;

use super::model::{CaseId, CaseRecord, CaseStatus, NewCase};
use crate::store::{format_timestamp, parse_timestamp};
use crate::{Error, Result};

pub(crate) const SCHEMA: &[&str] = &[r"
    CREATE TABLE IF NOT EXISTS cases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        subject TEXT,
        sender TEXT,
        email_id TEXT,
        status TEXT NOT NULL DEFAULT 'Open',
        created_at TEXT NOT NULL,
        UNIQUE(kind, email_id)
    )
    "];

/// Repository for parent cases.
#[derive(Debug, Clone)]
pub struct CaseRepository {
    pool: SqlitePool,
}

impl CaseRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a case by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: CaseId) -> Result<Option<CaseRecord>> {
        let row = sqlx::query("SELECT * FROM cases WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_case))
    }

    /// List cases of a kind, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, kind: &str) -> Result<Vec<CaseRecord>> {
        let rows = sqlx::query("SELECT * FROM cases WHERE kind = ? ORDER BY id DESC")
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_case).collect())
    }

    /// Count cases of a kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, kind: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cases WHERE kind = ?")
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Insert a new case in status `Open`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] when the kind already has a case with the
    /// same email-identifying field, or a database error.
    pub async fn insert(conn: &mut SqliteConnection, case: &NewCase) -> Result<CaseRecord> {
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO cases (kind, subject, sender, email_id, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&case.kind)
        .bind(&case.subject)
        .bind(&case.sender)
        .bind(&case.email_id)
        .bind(CaseStatus::Open.as_str())
        .bind(format_timestamp(now))
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::from_insert(e, &case.kind))?;

        Ok(CaseRecord {
            id: CaseId::new(result.last_insert_rowid()),
            kind: case.kind.clone(),
            subject: case.subject.clone(),
            sender: case.sender.clone(),
            email_id: case.email_id.clone(),
            status: CaseStatus::Open,
            created_at: now,
        })
    }

    /// Get a case by ID on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_in(conn: &mut SqliteConnection, id: CaseId) -> Result<Option<CaseRecord>> {
        let row = sqlx::query("SELECT * FROM cases WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.as_ref().map(row_to_case))
    }

    /// Find a case of `kind` by its email-identifying field.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        kind: &str,
        email: &str,
    ) -> Result<Option<CaseRecord>> {
        let row = sqlx::query("SELECT * FROM cases WHERE kind = ? AND email_id = ?")
            .bind(kind)
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.as_ref().map(row_to_case))
    }

    /// Update the status of a case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the case does not exist, or a database
    /// error.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: CaseId,
        status: &CaseStatus,
    ) -> Result<()> {
        let updated = sqlx::query("UPDATE cases SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.0)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(Error::NotFound {
                kind: "Case".into(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn row_to_case(row: &SqliteRow) -> CaseRecord {
    CaseRecord {
        id: CaseId::new(row.get("id")),
        kind: row.get("kind"),
        subject: row.get("subject"),
        sender: row.get("sender"),
        email_id: row.get("email_id"),
        status: CaseStatus::parse(row.get("status")),
        created_at: parse_timestamp(row.get("created_at")),
    }
}
