//! Scheduler runs across several accounts.

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{MemoryMailbox, RecordingMailer, mail};
use threadline_core::{
    Account, Context, DeliveryMode, Error, Ingestor, MailboxConnector, MailboxError,
    MailboxSession, OutboxDispatcher, PullMode, Scheduler, Store, ThreadResolver,
    UnrepliedNotifier,
};

/// Routes each account to its own mailbox; unknown accounts fail to log in.
#[derive(Debug, Default)]
struct Mailboxes(HashMap<String, MemoryMailbox>);

#[async_trait]
impl MailboxConnector for Mailboxes {
    async fn connect(&self, account: &Account) -> Result<Box<dyn MailboxSession>, MailboxError> {
        match self.0.get(&account.email) {
            Some(mailbox) => mailbox.connect(account).await,
            None => Err(MailboxError::Authentication(account.email.clone())),
        }
    }
}

async fn incoming_account(store: &Store, email: &str) -> Account {
    let mut account = Account::with_email(email);
    account.incoming.enabled = true;
    account.incoming.host = "pop.example.com".into();
    account.incoming.port = 995;
    account.append_to = Some("Issue".into());
    store.accounts().save(&mut account).await.unwrap();
    account
}

async fn scheduler(store: &Store) -> (Scheduler, MemoryMailbox) {
    incoming_account(store, "sales@example.com").await;
    incoming_account(store, "broken@example.com").await;
    let mut off = Account::with_email("archive@example.com");
    store.accounts().save(&mut off).await.unwrap();

    let sales = MemoryMailbox::with(vec![
        mail("a@example.com", "One", None, "x"),
        mail("b@example.com", "Two", None, "y"),
    ]);
    let mut routes = HashMap::new();
    routes.insert("sales@example.com".to_string(), sales.clone());

    let ingestor = Ingestor::new(
        store.clone(),
        ThreadResolver::default(),
        Arc::new(Mailboxes(routes)),
        DeliveryMode::Destructive,
    );
    let scheduler = Scheduler::new(
        store.clone(),
        ingestor,
        UnrepliedNotifier::new(store.clone(), Some(3)),
        OutboxDispatcher::new(store.clone(), Arc::new(RecordingMailer::default()), 3, 10),
        Arc::new(Context::normal()),
    );
    (scheduler, sales)
}

#[tokio::test]
async fn failing_account_does_not_stop_the_others() {
    for mode in [PullMode::Inline, PullMode::Spawned] {
        let store = Store::in_memory().await.unwrap();
        let (scheduler, sales) = scheduler(&store).await;

        let results = scheduler.pull(mode).await.unwrap();
        assert_eq!(results.len(), 2, "{mode:?}");

        let by_email: HashMap<_, _> = results.iter().map(|r| (r.email.as_str(), r)).collect();
        let pulled = by_email["sales@example.com"].outcome.as_ref().unwrap();
        assert_eq!(pulled.ingested, 2);
        assert!(matches!(
            by_email["broken@example.com"].outcome,
            Err(Error::Mailbox(MailboxError::Authentication(_)))
        ));

        assert_eq!(sales.remaining(), 0);
        assert_eq!(store.conversations().count().await.unwrap(), 2);
    }
}

#[tokio::test]
async fn sweep_and_dispatch_with_nothing_to_do() {
    let store = Store::in_memory().await.unwrap();
    let (scheduler, _) = scheduler(&store).await;

    let sweep = scheduler.notify_unreplied().await.unwrap();
    assert_eq!(sweep.notified, 0);
    let dispatch = scheduler.dispatch_outbox().await.unwrap();
    assert_eq!(dispatch.sent, 0);
}
