//! Account save pipeline: name, validate, check connectivity, persist.

use std::sync::Arc;

use tracing::{debug, info};

use super::model::{Account, AccountId};
use super::validation::{ValidationError, validate_account};
use crate::case::CaseKinds;
use crate::context::Context;
use crate::mailbox::{Deletion, MailboxConnector};
use crate::mailer::Mailer;
use crate::store::Store;
use crate::{Error, Result};

/// Creates, updates and deletes accounts.
#[derive(Clone)]
pub struct AccountService {
    store: Store,
    kinds: CaseKinds,
    connector: Arc<dyn MailboxConnector>,
    mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Store,
        kinds: CaseKinds,
        connector: Arc<dyn MailboxConnector>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            kinds,
            connector,
            mailer,
        }
    }

    /// Saves an account.
    ///
    /// Fills in a generated name when none is set, validates, checks the
    /// enabled servers when the context is in normal mode, then stores the
    /// account and its default slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when only connection parameters are
    /// missing, [`Error::Validation`] for other invalid settings, a mailbox
    /// or send error from the connectivity check, or a storage error.
    pub async fn save(&self, account: &mut Account, ctx: &Context) -> Result<()> {
        account.apply_auto_name();
        validate_account(account, &self.kinds).map_err(validation_error)?;

        if ctx.checks_connectivity() {
            self.check_connectivity(account).await?;
        } else {
            debug!(email = %account.email, mode = ?ctx.mode(), "Skipping connectivity check");
        }

        self.store.accounts().save(account).await?;
        info!(email = %account.email, name = %account.name, "Account saved");
        Ok(())
    }

    /// Logs in to the enabled incoming and outgoing servers without
    /// touching any mail.
    ///
    /// # Errors
    ///
    /// Returns the first mailbox or send error.
    pub async fn check_connectivity(&self, account: &Account) -> Result<()> {
        if account.incoming.enabled {
            let session = self.connector.connect(account).await?;
            session.finish(Deletion::Only(Vec::new())).await?;
            debug!(host = %account.incoming.host, "POP3 login succeeded");
        }
        if account.outgoing.enabled {
            self.mailer.verify(account).await?;
            debug!(host = %account.outgoing.host, "SMTP connection succeeded");
        }
        Ok(())
    }

    /// Deletes an account, detaching its conversation entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] or a storage error.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        self.store.accounts().delete(id).await
    }
}

fn validation_error(errors: Vec<ValidationError>) -> Error {
    if errors
        .iter()
        .all(ValidationError::is_missing_connection_parameter)
    {
        let fields: Vec<_> = errors.iter().map(ToString::to_string).collect();
        Error::Config(fields.join("; "))
    } else {
        Error::Validation(errors)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::conversation::EntryAttachment;
    use crate::mailbox::{MailboxError, MailboxSession, RawMessage};
    use crate::mailer::SendError;
    use crate::outbox::OutboundMail;
    use crate::DefaultRole;

    #[derive(Default)]
    struct CountingConnector {
        connects: AtomicUsize,
    }

    struct EmptySession;

    #[async_trait]
    impl MailboxSession for EmptySession {
        async fn fetch(&mut self, _: &HashSet<String>) -> std::result::Result<Vec<RawMessage>, MailboxError> {
            Ok(Vec::new())
        }

        async fn finish(self: Box<Self>, _: Deletion) -> std::result::Result<(), MailboxError> {
            Ok(())
        }
    }

    #[async_trait]
    impl MailboxConnector for CountingConnector {
        async fn connect(
            &self,
            _: &Account,
        ) -> std::result::Result<Box<dyn MailboxSession>, MailboxError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EmptySession))
        }
    }

    struct RefusingMailer;

    #[async_trait]
    impl Mailer for RefusingMailer {
        async fn send(
            &self,
            _: &OutboundMail,
            _: &[EntryAttachment],
            _: &Account,
        ) -> std::result::Result<(), SendError> {
            Ok(())
        }

        async fn verify(&self, _: &Account) -> std::result::Result<(), SendError> {
            Err(SendError::Configuration("refused".into()))
        }
    }

    async fn service() -> (AccountService, Arc<CountingConnector>, Store) {
        let store = Store::in_memory().await.unwrap();
        let connector = Arc::new(CountingConnector::default());
        let service = AccountService::new(
            store.clone(),
            CaseKinds::default(),
            connector.clone(),
            Arc::new(RefusingMailer),
        );
        (service, connector, store)
    }

    fn incoming(email: &str) -> Account {
        let mut account = Account::with_email(email);
        account.incoming.enabled = true;
        account.incoming.host = "pop.example.com".into();
        account.incoming.port = 995;
        account
    }

    #[tokio::test]
    async fn test_mode_skips_connectivity_and_names_account() {
        let (service, connector, store) = service().await;
        let mut account = incoming("help_desk@example.com");
        account.service = Some("Support".into());

        service.save(&mut account, &Context::test()).await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert_eq!(account.name, "Help Desk Support");
        assert!(store.accounts().get(account.id.unwrap()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn normal_mode_checks_enabled_servers() {
        let (service, connector, _) = service().await;

        let mut account = incoming("desk@example.com");
        service.save(&mut account, &Context::normal()).await.unwrap();
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        account.outgoing.enabled = true;
        account.outgoing.host = "smtp.example.com".into();
        account.outgoing.port = 587;
        let err = service.save(&mut account, &Context::normal()).await.unwrap_err();
        assert!(matches!(err, Error::Send(SendError::Configuration(_))));
    }

    #[tokio::test]
    async fn missing_host_is_configuration_error() {
        let (service, connector, _) = service().await;
        let mut account = incoming("desk@example.com");
        account.incoming.host.clear();

        let err = service.save(&mut account, &Context::normal()).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);

        account.incoming.host = "pop.example.com".into();
        account.append_to = Some("Ticket".into());
        let err = service.save(&mut account, &Context::test()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(errors) if errors.len() == 1));
    }

    #[tokio::test]
    async fn defaults_stay_unique_across_saves() {
        let (service, _, store) = service().await;
        let ctx = Context::test();

        let mut a = incoming("a@example.com");
        a.default_incoming = true;
        service.save(&mut a, &ctx).await.unwrap();
        let mut b = incoming("b@example.com");
        b.default_incoming = true;
        service.save(&mut b, &ctx).await.unwrap();

        let holders: Vec<_> = store
            .accounts()
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|acc| acc.default_incoming)
            .collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id, b.id);
        assert_eq!(
            store.accounts().default_account(DefaultRole::Incoming).await.unwrap().unwrap().id,
            b.id
        );
    }
}
