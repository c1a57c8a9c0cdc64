//! Outbound mail transport.

mod smtp;

use async_trait::async_trait;
use thiserror::Error;

use crate::account::Account;
use crate::conversation::EntryAttachment;
use crate::outbox::OutboundMail;

pub use smtp::SmtpMailer;

/// Errors from building or delivering outbound mail.
#[derive(Debug, Error)]
pub enum SendError {
    /// The sending account is missing a required setting.
    #[error("Mail configuration error: {0}")]
    Configuration(String),

    /// An address did not parse.
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The message could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// The SMTP exchange failed.
    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Sends mail through an account's outgoing server.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends `mail` through `via`.
    async fn send(
        &self,
        mail: &OutboundMail,
        attachments: &[EntryAttachment],
        via: &Account,
    ) -> Result<(), SendError>;

    /// Checks that the account's outgoing server accepts a connection and
    /// its credentials.
    async fn verify(&self, account: &Account) -> Result<(), SendError>;
}
