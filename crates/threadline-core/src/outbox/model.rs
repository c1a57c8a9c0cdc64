//! Outbox item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::case::CaseRef;
use crate::conversation::EntryId;

/// Why a mail was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailPurpose {
    /// First-contact reply to a new thread.
    AutoReply,
    /// Copy of a new message to the other participants of its thread.
    ParticipantNotification,
    /// Alert that a thread has gone unanswered.
    UnrepliedAlert,
}

impl MailPurpose {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::AutoReply => "auto_reply",
            Self::ParticipantNotification => "participant_notification",
            Self::UnrepliedAlert => "unreplied_alert",
        }
    }
}

impl std::fmt::Display for MailPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mail waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMail {
    /// Why it was queued.
    pub purpose: MailPurpose,
    /// Account the mail belongs to; its outgoing settings are preferred.
    pub account_id: Option<AccountId>,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// From address; the sending account's address when unset.
    pub sender: Option<String>,
    /// Reply-To address.
    pub reply_to: Option<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub content: String,
    /// Case the mail is about.
    pub reference: Option<CaseRef>,
    /// Entry whose id becomes the local part of the `Message-ID`.
    pub message_id: Option<EntryId>,
    /// Footer text offering to leave the conversation.
    pub unsubscribe_text: Option<String>,
    /// Low-priority mail, sent after everything else.
    pub bulk: bool,
    /// Entry whose stored attachments go along with the mail.
    pub attachments_from: Option<EntryId>,
}

impl OutboundMail {
    /// Mail with the required fields set and everything else empty.
    #[must_use]
    pub const fn new(
        purpose: MailPurpose,
        recipients: Vec<String>,
        subject: String,
        content: String,
    ) -> Self {
        Self {
            purpose,
            account_id: None,
            recipients,
            sender: None,
            reply_to: None,
            subject,
            content,
            reference: None,
            message_id: None,
            unsubscribe_text: None,
            bulk: false,
            attachments_from: None,
        }
    }
}

/// Delivery state of a queued mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboxStatus {
    /// Waiting to be sent (possibly after failed attempts).
    Pending,
    /// Delivered to the transport.
    Sent,
    /// Gave up after too many attempts.
    Failed,
}

impl OutboxStatus {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub(crate) fn from_db(s: &str) -> Self {
        match s {
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// A stored outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxItem {
    /// Row identifier.
    pub id: i64,
    /// The queued mail.
    pub mail: OutboundMail,
    /// Delivery state.
    pub status: OutboxStatus,
    /// Delivery attempts so far.
    pub attempts: u32,
    /// Error of the last failed attempt.
    pub last_error: Option<String>,
    /// When the mail was queued.
    pub created_at: DateTime<Utc>,
}
