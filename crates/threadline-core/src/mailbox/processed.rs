//! Markers for messages already ingested in acknowledged delivery mode.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnection, SqlitePool};

use crate::Result;
use crate::account::AccountId;
use crate::store::format_timestamp;

pub(crate) const SCHEMA: &[&str] = &[r"
    CREATE TABLE IF NOT EXISTS processed_messages (
        account_id INTEGER NOT NULL,
        uid TEXT NOT NULL,
        processed_at TEXT NOT NULL,
        PRIMARY KEY (account_id, uid)
    )
    "];

/// Processed-message markers keyed by account and server UID.
pub struct ProcessedMessages;

impl ProcessedMessages {
    /// UIDs already ingested for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(pool: &SqlitePool, account: AccountId) -> Result<HashSet<String>> {
        let uids: Vec<(String,)> =
            sqlx::query_as("SELECT uid FROM processed_messages WHERE account_id = ?")
                .bind(account.0)
                .fetch_all(pool)
                .await?;
        Ok(uids.into_iter().map(|(uid,)| uid).collect())
    }

    /// Records a UID as ingested. Recording it twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record(conn: &mut SqliteConnection, account: AccountId, uid: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO processed_messages (account_id, uid, processed_at) VALUES (?, ?, ?)",
        )
        .bind(account.0)
        .bind(uid)
        .bind(format_timestamp(Utc::now()))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
