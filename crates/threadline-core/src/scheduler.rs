//! Entry points for whatever drives the engine periodically.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::account::{Account, AccountId};
use crate::context::Context;
use crate::ingest::{Ingestor, PullReport};
use crate::notify::{SweepReport, UnrepliedNotifier};
use crate::outbox::{DispatchReport, OutboxDispatcher};
use crate::store::Store;
use crate::{Error, Result};

/// How [`Scheduler::pull`] runs the per-account pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullMode {
    /// One account after another on the calling task.
    #[default]
    Inline,
    /// One task per account, all awaited.
    Spawned,
}

/// Result of pulling one account.
#[derive(Debug)]
pub struct AccountPull {
    /// Account pulled.
    pub account: Option<AccountId>,
    /// Address of the account.
    pub email: String,
    /// The pull outcome.
    pub outcome: Result<PullReport>,
}

/// Drives ingestion, the unreplied sweep and outbox delivery.
#[derive(Debug, Clone)]
pub struct Scheduler {
    store: Store,
    ingestor: Ingestor,
    notifier: UnrepliedNotifier,
    dispatcher: OutboxDispatcher,
    context: Arc<Context>,
}

impl Scheduler {
    /// Creates a scheduler.
    #[must_use]
    pub const fn new(
        store: Store,
        ingestor: Ingestor,
        notifier: UnrepliedNotifier,
        dispatcher: OutboxDispatcher,
        context: Arc<Context>,
    ) -> Self {
        Self {
            store,
            ingestor,
            notifier,
            dispatcher,
            context,
        }
    }

    /// Pulls every account with incoming mail enabled.
    ///
    /// A failing account does not stop the others; each outcome is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the account list cannot be read.
    pub async fn pull(&self, mode: PullMode) -> Result<Vec<AccountPull>> {
        let accounts = self.store.accounts().list_incoming().await?;
        info!(accounts = accounts.len(), ?mode, "Pulling mailboxes");

        let mut results = Vec::with_capacity(accounts.len());
        match mode {
            PullMode::Inline => {
                for account in accounts {
                    let outcome = self.ingestor.pull(&account, &self.context).await;
                    results.push(Self::finish(&account, outcome));
                }
            }
            PullMode::Spawned => {
                let mut tasks = JoinSet::new();
                for account in accounts {
                    let ingestor = self.ingestor.clone();
                    let context = Arc::clone(&self.context);
                    tasks.spawn(async move {
                        let outcome = ingestor.pull(&account, &context).await;
                        Self::finish(&account, outcome)
                    });
                }
                while let Some(joined) = tasks.join_next().await {
                    match joined {
                        Ok(result) => results.push(result),
                        Err(e) => error!("Pull task failed: {}", e),
                    }
                }
                results.sort_by_key(|r| r.account);
            }
        }
        Ok(results)
    }

    fn finish(account: &Account, outcome: Result<PullReport>) -> AccountPull {
        if let Err(e) = &outcome
            && !matches!(e, Error::Ingestion(_))
        {
            // per-message failures were already logged by the ingestor
            error!(email = %account.email, "Pull failed: {}", e);
        }
        AccountPull {
            account: account.id,
            email: account.email.clone(),
            outcome,
        }
    }

    /// Runs the unreplied sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the sweep cannot read its inputs.
    pub async fn notify_unreplied(&self) -> Result<SweepReport> {
        self.notifier.sweep().await
    }

    /// Delivers one batch of queued mail.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbox cannot be read or updated.
    pub async fn dispatch_outbox(&self) -> Result<DispatchReport> {
        self.dispatcher.dispatch_pending().await
    }
}
