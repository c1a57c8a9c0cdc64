//! Unreplied-thread notifier.
//!
//! Each sweep looks at received entries of the watched case kind that are
//! older than the account's window `T` and, unless the lookback is
//! disabled, younger than `factor * T`. An entry whose case is still open
//! queues one alert; every examined entry is flagged so no later sweep
//! looks at it again.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::case::CaseRepository;
use crate::conversation::{ConversationRepository, UnrepliedCandidate};
use crate::outbox::{MailPurpose, OutboundMail, OutboxRepository};
use crate::render::text_to_html;
use crate::store::Store;
use crate::Result;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Accounts swept.
    pub accounts: usize,
    /// Candidate entries looked at.
    pub examined: usize,
    /// Alerts queued.
    pub notified: usize,
    /// Candidates that could not be handled and will be retried.
    pub failed: usize,
}

/// Sweeps for threads nobody answered.
#[derive(Debug, Clone)]
pub struct UnrepliedNotifier {
    store: Store,
    lookback_factor: Option<u32>,
}

impl UnrepliedNotifier {
    /// Creates a notifier. `lookback_factor` of `None` removes the lower
    /// bound of the window.
    #[must_use]
    pub const fn new(store: Store, lookback_factor: Option<u32>) -> Self {
        Self {
            store,
            lookback_factor,
        }
    }

    /// Sweeps every watching account as of now.
    ///
    /// # Errors
    ///
    /// Returns an error if accounts or candidates cannot be read.
    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweeps every watching account as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if accounts or candidates cannot be read.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for account in self.store.accounts().list_incoming().await? {
            if !account.watches_unreplied() {
                continue;
            }
            let Some(kind) = account.append_to.as_deref() else {
                continue;
            };
            report.accounts += 1;

            let window = account.unreplied_window();
            let upper = now - window;
            let lower = self.lookback_factor.filter(|f| *f > 0).and_then(|f| {
                let span = window.checked_mul(i32::try_from(f).ok()?)?;
                now.checked_sub_signed(span)
            });

            let candidates = self
                .store
                .conversations()
                .unreplied_candidates(kind, lower, upper)
                .await?;
            debug!(email = %account.email, kind, candidates = candidates.len(), "Unreplied sweep");

            for candidate in candidates {
                report.examined += 1;
                match self.handle(&account, &candidate).await {
                    Ok(true) => report.notified += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(entry = %candidate.entry_id, "Unreplied check failed: {}", e);
                        report.failed += 1;
                    }
                }
            }
        }

        if report.notified > 0 || report.failed > 0 {
            info!(
                examined = report.examined,
                notified = report.notified,
                failed = report.failed,
                "Unreplied sweep finished"
            );
        }
        Ok(report)
    }

    /// Queues the alert if the case is still open and flags the entry.
    /// Returns whether an alert was queued.
    async fn handle(&self, account: &Account, candidate: &UnrepliedCandidate) -> Result<bool> {
        let mut tx = self.store.begin().await?;

        let open = CaseRepository::get_in(&mut tx, candidate.reference.id)
            .await?
            .is_some_and(|case| case.kind == candidate.reference.kind && case.is_open());

        let recipients = account.notification_recipients();
        let notify = open && !recipients.is_empty();
        if open && recipients.is_empty() {
            warn!(email = %account.email, "Unreplied alerts enabled without recipients");
        }

        if notify {
            let mut mail = OutboundMail::new(
                MailPurpose::UnrepliedAlert,
                recipients,
                candidate.subject.clone(),
                text_to_html(&candidate.content),
            );
            mail.account_id = account.id;
            mail.reference = Some(candidate.reference.clone());
            mail.bulk = true;
            OutboxRepository::enqueue(&mut tx, &mail).await?;
        }
        ConversationRepository::mark_notified(&mut tx, &candidate.entry_id).await?;

        tx.commit().await?;
        if notify {
            debug!(entry = %candidate.entry_id, case = %candidate.reference, "Queued unreplied alert");
        }
        Ok(notify)
    }
}
