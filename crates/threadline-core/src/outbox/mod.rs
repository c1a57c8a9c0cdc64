//! Transactional outbox for mail produced by ingestion and the notifier.
//!
//! Mail is queued in the same transaction as the record that caused it and
//! delivered later by the [`OutboxDispatcher`], so a rolled-back message
//! never sends anything and slow delivery never holds up ingestion.

mod dispatch;
mod model;
mod repository;

pub use dispatch::{DispatchReport, OutboxDispatcher};
pub use model::{MailPurpose, OutboundMail, OutboxItem, OutboxStatus};
pub use repository::OutboxRepository;
pub(crate) use repository::SCHEMA;
