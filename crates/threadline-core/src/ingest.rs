//! Conversation ingestor.
//!
//! Every raw message is handled in its own transaction: the entry, its
//! attachments, any case it creates and the mail it queues commit together
//! or not at all. A failing message is logged and collected; the others
//! still commit, and the pull reports the failures once at the end.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnection;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::account::{Account, AccountId};
use crate::autoreply::{AutoReplyPolicy, LEAVE_CONVERSATION};
use crate::case::{CaseRepository, CaseStatus};
use crate::context::Context;
use crate::conversation::{ConversationEntry, ConversationRepository};
use crate::decode::NormalizedMessage;
use crate::mailbox::{Deletion, MailboxConnector, ProcessedMessages, RawMessage};
use crate::outbox::{MailPurpose, OutboundMail, OutboxRepository};
use crate::render::text_to_html;
use crate::settings::DeliveryMode;
use crate::store::Store;
use crate::thread::{Resolution, ThreadResolver};
use crate::{Error, Result};

/// One message that could not be ingested.
#[derive(Debug)]
pub struct MessageFailure {
    /// 1-based position in the fetch result.
    pub position: usize,
    /// Server UID, when known.
    pub uid: Option<String>,
    /// What went wrong.
    pub error: Error,
}

impl fmt::Display for MessageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message {}", self.position)?;
        if let Some(uid) = &self.uid {
            write!(f, " ({uid})")?;
        }
        write!(f, ": {}", self.error)
    }
}

/// Every per-message failure of one pull.
#[derive(Debug, Error)]
#[error(
    "{} of {} messages for account {} failed: {}",
    .failures.len(),
    .total,
    .account,
    join_failures(.failures)
)]
pub struct AggregateIngestionError {
    /// Account that was pulled.
    pub account: AccountId,
    /// Messages fetched.
    pub total: usize,
    /// The failures, in fetch order.
    pub failures: Vec<MessageFailure>,
}

fn join_failures(failures: &[MessageFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of a pull with no failed messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Messages fetched.
    pub fetched: usize,
    /// Messages stored.
    pub ingested: usize,
    /// Cases created.
    pub cases_created: usize,
}

/// What one successfully ingested message did.
struct Ingested {
    created_case: bool,
}

/// Pulls mailboxes and turns their messages into conversation entries.
#[derive(Clone)]
pub struct Ingestor {
    store: Store,
    resolver: ThreadResolver,
    connector: Arc<dyn MailboxConnector>,
    delivery: DeliveryMode,
}

impl fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingestor")
            .field("resolver", &self.resolver)
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    /// Creates an ingestor.
    #[must_use]
    pub fn new(
        store: Store,
        resolver: ThreadResolver,
        connector: Arc<dyn MailboxConnector>,
        delivery: DeliveryMode,
    ) -> Self {
        Self {
            store,
            resolver,
            connector,
            delivery,
        }
    }

    /// Pulls `account`'s mailbox and ingests every message.
    ///
    /// Does nothing when incoming mail is disabled. Under a test context the
    /// messages come from the context's fixtures instead of a server.
    ///
    /// # Errors
    ///
    /// Returns a configuration or mailbox error that stops the pull before
    /// any message is processed, or [`Error::Ingestion`] listing every
    /// message that failed after the rest were committed.
    pub async fn pull(&self, account: &Account, ctx: &Context) -> Result<PullReport> {
        if !account.incoming.enabled {
            debug!(email = %account.email, "Incoming disabled, skipping pull");
            return Ok(PullReport::default());
        }
        let account_id = account
            .id
            .ok_or_else(|| Error::Config(format!("account {} is not saved", account.email)))?;

        if ctx.is_test() {
            let messages = ctx.take_fixtures(account_id);
            let (report, _) = self.ingest_all(account, account_id, &messages).await;
            return report;
        }

        let mut session = self.connector.connect(account).await?;
        match self.delivery {
            DeliveryMode::Destructive => {
                let messages = session.fetch(&HashSet::new()).await?;
                session.finish(Deletion::All).await?;
                let (report, _) = self.ingest_all(account, account_id, &messages).await;
                report
            }
            DeliveryMode::Acknowledged => {
                let seen = ProcessedMessages::load(self.store.pool(), account_id).await?;
                let messages = session.fetch(&seen).await?;
                let (report, committed) = self.ingest_all(account, account_id, &messages).await;
                if let Err(e) = session.finish(Deletion::Only(committed)).await {
                    // markers are committed, the next pull deletes these
                    warn!(account = %account_id, "Could not remove processed messages: {}", e);
                }
                report
            }
        }
    }

    /// Ingests a batch in order. Returns the report and the positions of
    /// the messages that committed.
    async fn ingest_all(
        &self,
        account: &Account,
        account_id: AccountId,
        messages: &[RawMessage],
    ) -> (Result<PullReport>, Vec<usize>) {
        let mut report = PullReport {
            fetched: messages.len(),
            ..PullReport::default()
        };
        let mut committed = Vec::with_capacity(messages.len());
        let mut failures = Vec::new();

        for (index, raw) in messages.iter().enumerate() {
            match self.ingest_one(account, account_id, raw).await {
                Ok(ingested) => {
                    report.ingested += 1;
                    if ingested.created_case {
                        report.cases_created += 1;
                    }
                    committed.push(index);
                }
                Err(e) => {
                    warn!(
                        account = %account_id,
                        position = index + 1,
                        uid = raw.uid.as_deref().unwrap_or("-"),
                        "Failed to ingest message: {}",
                        e
                    );
                    failures.push(MessageFailure {
                        position: index + 1,
                        uid: raw.uid.clone(),
                        error: e,
                    });
                }
            }
        }

        if !messages.is_empty() {
            info!(
                account = %account_id,
                fetched = report.fetched,
                ingested = report.ingested,
                cases_created = report.cases_created,
                "Pull finished"
            );
        }

        if failures.is_empty() {
            return (Ok(report), committed);
        }
        let aggregate = AggregateIngestionError {
            account: account_id,
            total: messages.len(),
            failures,
        };
        error!("{}", aggregate);
        (Err(aggregate.into()), committed)
    }

    async fn ingest_one(
        &self,
        account: &Account,
        account_id: AccountId,
        raw: &RawMessage,
    ) -> Result<Ingested> {
        let message = NormalizedMessage::decode(&raw.bytes)?;

        let mut entry = ConversationEntry::received(account_id, message.sender.clone());
        entry.subject.clone_from(&message.subject);
        entry.content.clone_from(&message.text);
        entry.content_html.clone_from(&message.html);
        entry.sender_full_name.clone_from(&message.sender_name);
        entry.recipients.clone_from(&message.recipients);

        let mut tx = self.store.begin().await?;

        let resolution = self.resolver.resolve(&mut tx, &message, account).await?;
        if let Resolution::Existing(case) = &resolution
            && case.status == CaseStatus::Replied
        {
            CaseRepository::set_status(&mut tx, case.id, &CaseStatus::Open).await?;
            debug!(case = %case.reference(), "Reply re-opened case");
        }
        entry.reference = resolution.case().map(|case| case.reference());
        entry.is_first = resolution.is_first();

        ConversationRepository::insert(&mut tx, &entry).await?;
        for attachment in &message.attachments {
            ConversationRepository::insert_attachment(&mut tx, &entry.id, attachment).await?;
        }

        if let Some(reply) = AutoReplyPolicy::compose(account, &entry) {
            OutboxRepository::enqueue(&mut tx, &reply).await?;
        }
        if let Some(notification) =
            participant_notification(&mut tx, account, &entry, !message.attachments.is_empty())
                .await?
        {
            OutboxRepository::enqueue(&mut tx, &notification).await?;
        }

        if self.delivery == DeliveryMode::Acknowledged
            && let Some(uid) = &raw.uid
        {
            ProcessedMessages::record(&mut tx, account_id, uid).await?;
        }

        tx.commit().await?;
        debug!(
            entry = %entry.id,
            case = ?entry.reference,
            is_first = entry.is_first,
            "Ingested message"
        );
        Ok(Ingested {
            created_case: resolution.is_first(),
        })
    }
}

/// Copy of a new message for everyone on its thread who did not get it
/// directly. The sender and the account itself are left out.
async fn participant_notification(
    conn: &mut SqliteConnection,
    account: &Account,
    entry: &ConversationEntry,
    has_attachments: bool,
) -> Result<Option<OutboundMail>> {
    let Some(reference) = &entry.reference else {
        return Ok(None);
    };

    let recipients: Vec<String> = ConversationRepository::participants(conn, reference)
        .await?
        .into_iter()
        .filter(|p| {
            !p.eq_ignore_ascii_case(&entry.sender)
                && !p.eq_ignore_ascii_case(&account.email)
                && !entry.recipients.iter().any(|r| r.eq_ignore_ascii_case(p))
        })
        .collect();
    if recipients.is_empty() {
        return Ok(None);
    }

    let content = entry
        .content_html
        .clone()
        .unwrap_or_else(|| text_to_html(&entry.content));
    let mut mail = OutboundMail::new(
        MailPurpose::ParticipantNotification,
        recipients,
        entry.subject.clone(),
        content,
    );
    mail.account_id = entry.account_id;
    mail.reply_to = Some(account.email.clone());
    mail.reference = Some(reference.clone());
    mail.message_id = Some(entry.id.clone());
    mail.unsubscribe_text = Some(LEAVE_CONVERSATION.to_string());
    mail.attachments_from = has_attachments.then(|| entry.id.clone());
    Ok(Some(mail))
}
