//! Conversation entry storage.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;

use super::model::{ConversationEntry, Direction, EntryAttachment, EntryId};
use crate::account::AccountId;
use crate::case::{CaseId, CaseRef};
use crate::store::{format_timestamp, parse_timestamp};
use crate::{Error, Result};

pub(crate) const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        subject TEXT NOT NULL,
        content TEXT NOT NULL,
        content_html TEXT,
        direction TEXT NOT NULL,
        sender TEXT NOT NULL,
        sender_full_name TEXT,
        recipients TEXT NOT NULL DEFAULT '',
        account_id INTEGER,
        medium TEXT NOT NULL,
        reference_kind TEXT,
        reference_id INTEGER,
        is_first INTEGER NOT NULL DEFAULT 0,
        unreplied_notification_sent INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    ",
    r"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_first_per_case
        ON conversations(reference_kind, reference_id) WHERE is_first = 1
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_conversations_unreplied
        ON conversations(reference_kind, unreplied_notification_sent, created_at)
    ",
    r"
    CREATE TABLE IF NOT EXISTS conversation_attachments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entry_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        filename TEXT NOT NULL,
        content_type TEXT NOT NULL,
        content BLOB NOT NULL
    )
    ",
];

/// Received entry eligible for an unreplied alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrepliedCandidate {
    /// Entry identifier.
    pub entry_id: EntryId,
    /// Entry subject.
    pub subject: String,
    /// Entry content.
    pub content: String,
    /// Parent case.
    pub reference: CaseRef,
    /// Owning account, if still attached.
    pub account_id: Option<AccountId>,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

/// Repository for conversation entries.
#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Creates a repository over an open pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &EntryId) -> Result<Option<ConversationEntry>> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_entry))
    }

    /// All entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<ConversationEntry>> {
        let rows = sqlx::query("SELECT * FROM conversations ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_entry).collect())
    }

    /// Entries linked to a case, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_case(&self, case: &CaseRef) -> Result<Vec<ConversationEntry>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM conversations
            WHERE reference_kind = ? AND reference_id = ?
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(&case.kind)
        .bind(case.id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_entry).collect())
    }

    /// Number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    /// Attachments stored against an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attachments(&self, id: &EntryId) -> Result<Vec<EntryAttachment>> {
        let rows = sqlx::query(
            "SELECT filename, content_type, content FROM conversation_attachments WHERE entry_id = ? ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| EntryAttachment {
                filename: row.get("filename"),
                content_type: row.get("content_type"),
                content: row.get("content"),
            })
            .collect())
    }

    /// Received entries of case kind `kind` whose alert is still pending and
    /// which were created strictly between `lower` and `upper`. No lower
    /// bound when `lower` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn unreplied_candidates(
        &self,
        kind: &str,
        lower: Option<DateTime<Utc>>,
        upper: DateTime<Utc>,
    ) -> Result<Vec<UnrepliedCandidate>> {
        let rows = sqlx::query(
            r"
            SELECT id, subject, content, reference_kind, reference_id, account_id, created_at
            FROM conversations
            WHERE direction = ?
              AND reference_kind = ?
              AND reference_id IS NOT NULL
              AND unreplied_notification_sent = 0
              AND created_at < ?
              AND (? IS NULL OR created_at > ?)
            ORDER BY created_at ASC
            ",
        )
        .bind(Direction::Received.as_str())
        .bind(kind)
        .bind(format_timestamp(upper))
        .bind(lower.map(format_timestamp))
        .bind(lower.map(format_timestamp))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| UnrepliedCandidate {
                entry_id: EntryId::new(row.get::<String, _>("id")),
                subject: row.get("subject"),
                content: row.get("content"),
                reference: CaseRef {
                    kind: row.get("reference_kind"),
                    id: CaseId::new(row.get("reference_id")),
                },
                account_id: row.get::<Option<i64>, _>("account_id").map(AccountId::new),
                created_at: parse_timestamp(row.get("created_at")),
            })
            .collect())
    }

    /// Insert an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] on a duplicate identifier or a second
    /// first entry for the same case, or a database error.
    pub async fn insert(conn: &mut SqliteConnection, entry: &ConversationEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO conversations (
                id, subject, content, content_html, direction, sender, sender_full_name,
                recipients, account_id, medium, reference_kind, reference_id,
                is_first, unreplied_notification_sent, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(entry.id.as_str())
        .bind(&entry.subject)
        .bind(&entry.content)
        .bind(&entry.content_html)
        .bind(entry.direction.as_str())
        .bind(&entry.sender)
        .bind(&entry.sender_full_name)
        .bind(entry.recipients.join(", "))
        .bind(entry.account_id.map(|id| id.0))
        .bind(&entry.medium)
        .bind(entry.reference.as_ref().map(|r| r.kind.as_str()))
        .bind(entry.reference.as_ref().map(|r| r.id.0))
        .bind(entry.is_first)
        .bind(entry.unreplied_notification_sent)
        .bind(format_timestamp(entry.created_at))
        .execute(&mut *conn)
        .await
        .map_err(|e| Error::from_insert(e, entry.id.as_str()))?;

        Ok(())
    }

    /// Store an attachment against an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_attachment(
        conn: &mut SqliteConnection,
        entry: &EntryId,
        attachment: &EntryAttachment,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO conversation_attachments (entry_id, filename, content_type, content)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(entry.as_str())
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(&attachment.content)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Get an entry by ID on the caller's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_in(
        conn: &mut SqliteConnection,
        id: &EntryId,
    ) -> Result<Option<ConversationEntry>> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.as_ref().map(row_to_entry))
    }

    /// Every sender and recipient address seen on a case, in first-seen
    /// order and without duplicates (compared case-insensitively).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn participants(conn: &mut SqliteConnection, case: &CaseRef) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r"
            SELECT sender, recipients FROM conversations
            WHERE reference_kind = ? AND reference_id = ?
            ORDER BY created_at ASC, rowid ASC
            ",
        )
        .bind(&case.kind)
        .bind(case.id.0)
        .fetch_all(&mut *conn)
        .await?;

        let mut seen = std::collections::HashSet::new();
        let mut participants = Vec::new();
        for row in &rows {
            let sender: String = row.get("sender");
            let recipients: String = row.get("recipients");
            for address in std::iter::once(sender.as_str()).chain(split_recipients(&recipients)) {
                if seen.insert(address.to_lowercase()) {
                    participants.push(address.to_string());
                }
            }
        }
        Ok(participants)
    }

    /// Flag the unreplied alert as handled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_notified(conn: &mut SqliteConnection, id: &EntryId) -> Result<()> {
        sqlx::query("UPDATE conversations SET unreplied_notification_sent = 1 WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

fn split_recipients(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn row_to_entry(row: &SqliteRow) -> ConversationEntry {
    let reference = match (
        row.get::<Option<String>, _>("reference_kind"),
        row.get::<Option<i64>, _>("reference_id"),
    ) {
        (Some(kind), Some(id)) => Some(CaseRef {
            kind,
            id: CaseId::new(id),
        }),
        _ => None,
    };

    ConversationEntry {
        id: EntryId::new(row.get::<String, _>("id")),
        subject: row.get("subject"),
        content: row.get("content"),
        content_html: row.get("content_html"),
        direction: Direction::from_db(row.get("direction")),
        sender: row.get("sender"),
        sender_full_name: row.get("sender_full_name"),
        recipients: split_recipients(row.get("recipients"))
            .map(str::to_string)
            .collect(),
        account_id: row.get::<Option<i64>, _>("account_id").map(AccountId::new),
        medium: row.get("medium"),
        reference,
        is_first: row.get("is_first"),
        unreplied_notification_sent: row.get("unreplied_notification_sent"),
        created_at: parse_timestamp(row.get("created_at")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::store::Store;

    fn entry(case: Option<CaseRef>, created_at: DateTime<Utc>) -> ConversationEntry {
        let mut entry = ConversationEntry::received(AccountId::new(1), "customer@example.com");
        entry.subject = "Help".into();
        entry.content = "It broke".into();
        entry.recipients = vec!["desk@example.com".into(), "cc@example.com".into()];
        entry.reference = case;
        entry.created_at = created_at;
        entry
    }

    fn issue(id: i64) -> CaseRef {
        CaseRef {
            kind: "Issue".into(),
            id: CaseId::new(id),
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let original = entry(Some(issue(1)), created);
        let mut conn = store.pool().acquire().await.unwrap();
        ConversationRepository::insert(&mut conn, &original).await.unwrap();
        ConversationRepository::insert_attachment(
            &mut conn,
            &original.id,
            &EntryAttachment {
                filename: "a.txt".into(),
                content_type: "text/plain".into(),
                content: b"hello".to_vec(),
            },
        )
        .await
        .unwrap();
        drop(conn);

        let repo = store.conversations();
        let fetched = repo.get(&original.id).await.unwrap().unwrap();
        assert_eq!(fetched, original);
        assert_eq!(repo.attachments(&original.id).await.unwrap()[0].content, b"hello");
    }

    #[tokio::test]
    async fn second_first_entry_for_case_is_rejected() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();

        let mut first = entry(Some(issue(1)), Utc::now());
        first.is_first = true;
        ConversationRepository::insert(&mut conn, &first).await.unwrap();

        let mut second = entry(Some(issue(1)), Utc::now());
        second.is_first = true;
        let err = ConversationRepository::insert(&mut conn, &second).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        second.is_first = false;
        ConversationRepository::insert(&mut conn, &second).await.unwrap();
    }

    #[tokio::test]
    async fn unreplied_window_bounds_are_strict() {
        let store = Store::in_memory().await.unwrap();
        let now = Utc::now();
        let window = Duration::minutes(30);

        let inside = entry(Some(issue(1)), now - window * 2);
        let too_new = entry(Some(issue(2)), now - window + Duration::seconds(1));
        let too_old = entry(Some(issue(3)), now - window * 3);
        let unlinked = entry(None, now - window * 2);
        let mut other_kind = entry(Some(issue(4)), now - window * 2);
        other_kind.reference = Some(CaseRef {
            kind: "Lead".into(),
            id: CaseId::new(4),
        });

        let mut conn = store.pool().acquire().await.unwrap();
        for e in [&inside, &too_new, &too_old, &unlinked, &other_kind] {
            ConversationRepository::insert(&mut conn, e).await.unwrap();
        }
        drop(conn);

        let repo = store.conversations();
        let found = repo
            .unreplied_candidates("Issue", Some(now - window * 3), now - window)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry_id, inside.id);

        let unbounded = repo
            .unreplied_candidates("Issue", None, now - window)
            .await
            .unwrap();
        assert_eq!(unbounded.len(), 2);
    }

    #[tokio::test]
    async fn participants_are_unique() {
        let store = Store::in_memory().await.unwrap();
        let mut conn = store.pool().acquire().await.unwrap();

        let first = entry(Some(issue(1)), Utc::now());
        let mut second = entry(Some(issue(1)), Utc::now());
        second.sender = "Desk@Example.com".into();
        second.recipients = vec!["customer@example.com".into(), "boss@example.com".into()];
        ConversationRepository::insert(&mut conn, &first).await.unwrap();
        ConversationRepository::insert(&mut conn, &second).await.unwrap();

        let participants = ConversationRepository::participants(&mut conn, &issue(1))
            .await
            .unwrap();
        assert_eq!(
            participants,
            [
                "customer@example.com",
                "desk@example.com",
                "cc@example.com",
                "boss@example.com"
            ]
        );
    }
}
