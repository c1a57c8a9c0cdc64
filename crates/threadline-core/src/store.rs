//! `SQLite` storage shared by every repository.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::account::{self, AccountRepository};
use crate::case::{self, CaseRepository};
use crate::conversation::{self, ConversationRepository};
use crate::outbox::{self, OutboxRepository};
use crate::{Result, mailbox};

/// Handle to the database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            // writers from other pooled connections wait instead of failing
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        debug!("Opened database at {:?}", path);
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // one connection that never expires, or the database vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates every table and index that does not exist yet.
    async fn initialize(&self) -> Result<()> {
        let schema = account::SCHEMA
            .iter()
            .chain(case::SCHEMA)
            .chain(conversation::SCHEMA)
            .chain(mailbox::SCHEMA)
            .chain(outbox::SCHEMA);

        for statement in schema {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Returns the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction. Dropping it without commit rolls back.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Account repository over this store.
    #[must_use]
    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.pool.clone())
    }

    /// Case repository over this store.
    #[must_use]
    pub fn cases(&self) -> CaseRepository {
        CaseRepository::new(self.pool.clone())
    }

    /// Conversation repository over this store.
    #[must_use]
    pub fn conversations(&self) -> ConversationRepository {
        ConversationRepository::new(self.pool.clone())
    }

    /// Outbox repository over this store.
    #[must_use]
    pub fn outbox(&self) -> OutboxRepository {
        OutboxRepository::new(self.pool.clone())
    }
}

/// Formats a timestamp with fixed microsecond precision so that stored
/// values sort lexically in chronological order.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp; unreadable values map to the Unix epoch.
#[must_use]
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 9, 59, 59).unwrap();
        let later = earlier + chrono::Duration::microseconds(1);
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(format_timestamp(earlier), "2024-01-01T09:59:59.000000Z");
    }

    #[test]
    fn timestamp_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(ts)), ts);
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::default());
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.initialize().await.unwrap();
    }
}
