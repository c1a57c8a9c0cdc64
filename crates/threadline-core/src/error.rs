//! Error types for the core library.

use thiserror::Error;

use crate::account::ValidationError;
use crate::decode::DecodeError;
use crate::ingest::AggregateIngestionError;
use crate::mailbox::MailboxError;
use crate::mailer::SendError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required setting or connection parameter is missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Account settings failed structural validation.
    #[error("Invalid account: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// A record with the same unique key already exists.
    #[error("Duplicate entry: {0}")]
    Conflict(String),

    /// Referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record type.
        kind: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// Parent case kind is not registered.
    #[error("Unknown case kind: {0}")]
    UnknownCaseKind(String),

    /// Mailbox connection or retrieval failed.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    /// Raw message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Outbound mail could not be built or delivered.
    #[error(transparent)]
    Send(#[from] SendError),

    /// One or more messages of a pull failed.
    #[error(transparent)]
    Ingestion(#[from] AggregateIngestionError),
}

impl Error {
    /// Maps a unique-constraint violation to [`Error::Conflict`], passing
    /// every other database error through.
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(format!("{what}: {}", db_err.message()))
            }
            other => Self::Database(other),
        }
    }

    /// Returns true for errors that abort a whole pull rather than a single
    /// message.
    #[must_use]
    pub const fn is_fatal_for_pull(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Mailbox(_))
    }
}

fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
