//! Mailbox client adapter.
//!
//! A [`MailboxConnector`] opens a [`MailboxSession`] for an account; the
//! session hands out raw messages and, when finished, removes the ones the
//! caller asks it to. The live implementation speaks POP3.

mod pop3;
mod processed;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::account::Account;

pub use self::pop3::Pop3Connector;
pub use processed::ProcessedMessages;
pub(crate) use processed::SCHEMA;

/// One message as fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Server-assigned stable identifier, when the server offers one.
    pub uid: Option<String>,
    /// Full RFC 5322 message.
    pub bytes: Vec<u8>,
}

impl RawMessage {
    /// Raw message without a server identifier.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self { uid: None, bytes }
    }

    /// Raw message with a server identifier.
    #[must_use]
    pub fn with_uid(uid: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            uid: Some(uid.into()),
            bytes,
        }
    }
}

/// Which messages a session removes from the server when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// Everything that was fetched.
    All,
    /// Only these positions of the fetch result, plus any message skipped
    /// as already processed.
    Only(Vec<usize>),
}

/// Mailbox adapter errors.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// A required connection parameter is missing. Raised before any
    /// network attempt.
    #[error("Mailbox configuration error: {0}")]
    Configuration(String),

    /// Could not reach or talk to the server.
    #[error("Mailbox connection failed: {0}")]
    Connection(#[source] threadline_pop3::Error),

    /// Server rejected the credentials.
    #[error("Mailbox authentication failed: {0}")]
    Authentication(String),

    /// Listing, retrieving or deleting messages failed.
    #[error("Mailbox fetch failed: {0}")]
    Fetch(#[source] threadline_pop3::Error),
}

/// Opens mailbox sessions.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Connects and logs in to the account's incoming mailbox.
    async fn connect(&self, account: &Account) -> Result<Box<dyn MailboxSession>, MailboxError>;
}

/// An open, authenticated mailbox.
#[async_trait]
pub trait MailboxSession: Send {
    /// Retrieves every message whose UID is not in `skip`, in server order.
    async fn fetch(&mut self, skip: &HashSet<String>) -> Result<Vec<RawMessage>, MailboxError>;

    /// Marks messages for removal and closes the session.
    async fn finish(self: Box<Self>, deletion: Deletion) -> Result<(), MailboxError>;
}
