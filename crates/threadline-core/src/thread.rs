//! Thread resolution: deciding which parent case a message belongs to.
//!
//! A reply is recognized by its `In-Reply-To` value. Values containing `@`
//! are treated as system-generated message ids whose local part is a
//! conversation entry id; the reply joins that entry's case. Anything else
//! falls through to creating a new case of the account's append-to kind,
//! or leaves the message unlinked.

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, info};

use crate::account::Account;
use crate::case::{CaseKinds, CaseRecord, CaseRepository};
use crate::conversation::{ConversationRepository, EntryId};
use crate::decode::NormalizedMessage;
use crate::{Error, Result};

/// Outcome of resolving one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The message replies to an entry of this case.
    Existing(CaseRecord),
    /// A new case was created for the message.
    Created(CaseRecord),
    /// Creation hit a duplicate key; this is the case that already held it.
    Recovered(CaseRecord),
    /// No case applies.
    Unlinked,
}

impl Resolution {
    /// The resolved case, if any.
    #[must_use]
    pub const fn case(&self) -> Option<&CaseRecord> {
        match self {
            Self::Existing(case) | Self::Created(case) | Self::Recovered(case) => Some(case),
            Self::Unlinked => None,
        }
    }

    /// Whether the message created its case.
    #[must_use]
    pub const fn is_first(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Entry id named by a thread reference, if it looks system-generated.
#[must_use]
pub fn candidate_entry_id(thread_reference: &str) -> Option<EntryId> {
    let (local, _) = thread_reference.split_once('@')?;
    let local = local.trim();
    (!local.is_empty()).then(|| EntryId::new(local))
}

/// Maps messages to parent cases.
#[derive(Debug, Clone, Default)]
pub struct ThreadResolver {
    kinds: CaseKinds,
}

impl ThreadResolver {
    /// Resolver over the given case kinds.
    #[must_use]
    pub const fn new(kinds: CaseKinds) -> Self {
        Self { kinds }
    }

    /// Registered case kinds.
    #[must_use]
    pub const fn kinds(&self) -> &CaseKinds {
        &self.kinds
    }

    /// Resolves `message` for `account`, creating a case when needed.
    ///
    /// Runs on the caller's connection so a created case rolls back with
    /// the rest of the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCaseKind`] when the append-to kind is not
    /// registered, [`Error::Conflict`] when creation collides and the kind
    /// has no email-identifying field, or a database error.
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        message: &NormalizedMessage,
        account: &Account,
    ) -> Result<Resolution> {
        if let Some(case) = Self::existing_case(conn, &message.thread_reference).await? {
            debug!(case = %case.reference(), "Message threads into existing case");
            return Ok(Resolution::Existing(case));
        }

        let Some(kind) = account.append_to.as_deref() else {
            return Ok(Resolution::Unlinked);
        };
        self.create_case(conn, kind, message).await
    }

    async fn existing_case(
        conn: &mut SqliteConnection,
        thread_reference: &str,
    ) -> Result<Option<CaseRecord>> {
        let Some(entry_id) = candidate_entry_id(thread_reference) else {
            return Ok(None);
        };
        let Some(entry) = ConversationRepository::get_in(conn, &entry_id).await? else {
            return Ok(None);
        };
        // replies attach to the entry's case, never to the entry itself
        let Some(reference) = entry.reference else {
            debug!(entry = %entry_id, "Referenced entry has no case");
            return Ok(None);
        };
        CaseRepository::get_in(conn, reference.id).await
    }

    async fn create_case(
        &self,
        conn: &mut SqliteConnection,
        kind: &str,
        message: &NormalizedMessage,
    ) -> Result<Resolution> {
        let mut case = self
            .kinds
            .new_case(kind)
            .ok_or_else(|| Error::UnknownCaseKind(kind.to_string()))?;
        if case.supports_subject() {
            case.set_subject(&message.subject);
        }
        if case.supports_sender() {
            case.set_sender(&message.sender);
        }

        let mut row = case.to_new_case();
        row.kind = kind.to_string();

        match CaseRepository::insert(conn, &row).await {
            Ok(created) => {
                info!(case = %created.reference(), sender = %message.sender, "Created case");
                Ok(Resolution::Created(created))
            }
            Err(Error::Conflict(detail)) if self.kinds.has_email_field(kind) => {
                let email = case.email_key().unwrap_or(&message.sender);
                match CaseRepository::find_by_email(conn, kind, email).await? {
                    Some(existing) => {
                        debug!(case = %existing.reference(), "Duplicate case, using existing");
                        Ok(Resolution::Recovered(existing))
                    }
                    None => Err(Error::Conflict(detail)),
                }
            }
            Err(e) => Err(e),
        }
    }
}
