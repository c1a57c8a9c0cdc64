//! Delivery of queued mail.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::model::{OutboxItem, OutboxStatus};
use crate::account::{Account, DefaultRole};
use crate::mailer::Mailer;
use crate::store::Store;
use crate::{Error, Result};

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Items delivered.
    pub sent: usize,
    /// Items that failed and will be retried.
    pub retrying: usize,
    /// Items that failed for good.
    pub failed: usize,
}

/// Sends pending outbox items through a [`Mailer`].
#[derive(Clone)]
pub struct OutboxDispatcher {
    store: Store,
    mailer: Arc<dyn Mailer>,
    max_attempts: u32,
    batch_size: u32,
}

impl std::fmt::Debug for OutboxDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboxDispatcher")
            .field("max_attempts", &self.max_attempts)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl OutboxDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(store: Store, mailer: Arc<dyn Mailer>, max_attempts: u32, batch_size: u32) -> Self {
        Self {
            store,
            mailer,
            max_attempts: max_attempts.max(1),
            batch_size: batch_size.max(1),
        }
    }

    /// Sends up to one batch of pending mail, non-bulk first.
    ///
    /// A failing item never stops the run; it is retried on later runs
    /// until it has been attempted `max_attempts` times.
    ///
    /// # Errors
    ///
    /// Returns an error only if the outbox itself cannot be read or updated.
    pub async fn dispatch_pending(&self) -> Result<DispatchReport> {
        let outbox = self.store.outbox();
        let mut report = DispatchReport::default();

        for item in outbox.pending(self.batch_size).await? {
            match self.deliver(&item).await {
                Ok(via) => {
                    outbox.mark_sent(item.id).await?;
                    debug!(item = item.id, purpose = %item.mail.purpose, via = %via, "Outbox item sent");
                    report.sent += 1;
                }
                Err(e) => {
                    let status = outbox
                        .record_failure(item.id, &e.to_string(), self.max_attempts)
                        .await?;
                    warn!(
                        item = item.id,
                        purpose = %item.mail.purpose,
                        attempt = item.attempts + 1,
                        "Outbox delivery failed: {}",
                        e
                    );
                    if status == OutboxStatus::Failed {
                        report.failed += 1;
                    } else {
                        report.retrying += 1;
                    }
                }
            }
        }

        if report != DispatchReport::default() {
            info!(
                sent = report.sent,
                retrying = report.retrying,
                failed = report.failed,
                "Outbox dispatch finished"
            );
        }
        Ok(report)
    }

    async fn deliver(&self, item: &OutboxItem) -> Result<String> {
        let via = self.sending_account(item).await?;
        let attachments = match &item.mail.attachments_from {
            Some(entry) => self.store.conversations().attachments(entry).await?,
            None => Vec::new(),
        };
        self.mailer.send(&item.mail, &attachments, &via).await?;
        Ok(via.email)
    }

    /// The mail's own account when it can send, else the default outgoing
    /// account.
    async fn sending_account(&self, item: &OutboxItem) -> Result<Account> {
        let accounts = self.store.accounts();
        if let Some(id) = item.mail.account_id
            && let Some(account) = accounts.get(id).await?
            && account.outgoing.enabled
        {
            return Ok(account);
        }

        match accounts.default_account(DefaultRole::Outgoing).await? {
            Some(account) if account.outgoing.enabled => Ok(account),
            _ => Err(Error::Config(
                "no account with outgoing mail enabled to send from".into(),
            )),
        }
    }
}
