//! Conversation entry types.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::case::CaseRef;

/// Medium recorded on every entry the engine creates.
pub const MEDIUM_EMAIL: &str = "Email";

const ID_LENGTH: usize = 10;
const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Entry identifier.
///
/// Outbound mail uses it as the local part of its `Message-ID`, so a reply's
/// `In-Reply-To` leads back to the entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random 10-character lowercase alphanumeric identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ID_LENGTH)
            .map(|_| char::from(ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())]))
            .collect();
        Self(id)
    }

    /// Borrow as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the desk sent or received the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Outbound.
    Sent,
    /// Inbound.
    Received,
}

impl Direction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "Sent",
            Self::Received => "Received",
        }
    }

    pub(crate) fn from_db(s: &str) -> Self {
        if s == "Sent" { Self::Sent } else { Self::Received }
    }
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Subject line.
    pub subject: String,
    /// Plain-text content.
    pub content: String,
    /// Original HTML body, kept for display.
    pub content_html: Option<String>,
    /// Sent or received.
    pub direction: Direction,
    /// Sender address.
    pub sender: String,
    /// Sender display name.
    pub sender_full_name: Option<String>,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// Owning account; cleared when the account is deleted.
    pub account_id: Option<AccountId>,
    /// Always [`MEDIUM_EMAIL`] for entries created here.
    pub medium: String,
    /// Parent case, if linked.
    pub reference: Option<CaseRef>,
    /// Whether this message created its parent case.
    pub is_first: bool,
    /// Whether the unreplied alert has been handled.
    pub unreplied_notification_sent: bool,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl ConversationEntry {
    /// Fresh received entry with a generated identifier.
    #[must_use]
    pub fn received(account_id: AccountId, sender: impl Into<String>) -> Self {
        Self {
            id: EntryId::generate(),
            subject: String::new(),
            content: String::new(),
            content_html: None,
            direction: Direction::Received,
            sender: sender.into(),
            sender_full_name: None,
            recipients: Vec::new(),
            account_id: Some(account_id),
            medium: MEDIUM_EMAIL.to_string(),
            reference: None,
            is_first: false,
            unreplied_notification_sent: false,
            created_at: Utc::now(),
        }
    }
}

/// Attachment stored against an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAttachment {
    /// File name.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Decoded bytes.
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_lowercase_alphanumeric() {
        let id = EntryId::generate();
        assert_eq!(id.as_str().len(), 10);
        assert!(
            id.as_str()
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        );
        assert_ne!(EntryId::generate(), id);
    }

    #[test]
    fn received_defaults() {
        let entry = ConversationEntry::received(AccountId::new(1), "a@example.com");
        assert_eq!(entry.direction, Direction::Received);
        assert_eq!(entry.medium, "Email");
        assert!(!entry.is_first);
        assert!(entry.reference.is_none());
    }
}
