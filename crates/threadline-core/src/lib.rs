//! # threadline-core
//!
//! Mailbox ingestion and reply threading for a shared support inbox.
//!
//! This crate provides:
//! - Account management with a transactional defaults registry
//! - Message decoding on top of `threadline-mime`
//! - **Thread resolution** - replies join the case of the entry they answer,
//!   new mail opens a case of the account's append-to kind
//! - **Ingestion** with per-message rollback and an aggregate error
//! - First-contact auto replies and participant notifications
//! - **Unreplied sweep** - one alert per stale, still-open thread
//! - A transactional outbox delivered over SMTP
//! - Local storage (`SQLite`)
//!
//! ## Flow
//!
//! ```text
//! Scheduler::pull ─→ Ingestor::pull ─→ MailboxSession::fetch
//!                        │
//!                        ├─→ NormalizedMessage::decode
//!                        ├─→ ThreadResolver::resolve
//!                        └─→ entry + attachments + outbox rows (one transaction)
//!
//! Scheduler::notify_unreplied ─→ UnrepliedNotifier::sweep ─→ outbox rows
//! Scheduler::dispatch_outbox  ─→ OutboxDispatcher ─→ Mailer::send
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod autoreply;
pub mod case;
pub mod context;
pub mod conversation;
pub mod decode;
mod error;
pub mod ingest;
pub mod mailbox;
pub mod mailer;
pub mod notify;
pub mod outbox;
pub mod render;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod thread;

pub use account::{
    Account, AccountId, AccountRepository, AccountService, DefaultRole, Security,
    ValidationError, ValidationResult, validate_account,
};
pub use autoreply::AutoReplyPolicy;
pub use case::{CaseId, CaseKinds, CaseRecord, CaseRef, CaseStatus, ParentCase};
pub use context::{Context, RunMode};
pub use conversation::{ConversationEntry, Direction, EntryAttachment, EntryId};
pub use decode::{DecodeError, NormalizedMessage};
pub use error::{Error, Result};
pub use ingest::{AggregateIngestionError, Ingestor, MessageFailure, PullReport};
pub use mailbox::{MailboxConnector, MailboxError, MailboxSession, Pop3Connector, RawMessage};
pub use mailer::{Mailer, SendError, SmtpMailer};
pub use notify::{SweepReport, UnrepliedNotifier};
pub use outbox::{DispatchReport, MailPurpose, OutboundMail, OutboxDispatcher, OutboxStatus};
pub use scheduler::{AccountPull, PullMode, Scheduler};
pub use settings::{DeliveryMode, EngineSettings};
pub use store::Store;
pub use thread::{Resolution, ThreadResolver};
