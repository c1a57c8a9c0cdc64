//! Account lifecycle against stored conversations.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{MemoryMailbox, RecordingMailer, desk_account, ingestor, mail, pull_fixtures};
use threadline_core::{
    Account, AccountService, CaseKinds, Context, DefaultRole, Error, RunMode, Store,
};

fn service(store: &Store) -> AccountService {
    AccountService::new(
        store.clone(),
        CaseKinds::default(),
        Arc::new(MemoryMailbox::default()),
        Arc::new(RecordingMailer::default()),
    )
}

#[tokio::test]
async fn deleting_an_account_detaches_its_entries() {
    let store = Store::in_memory().await.unwrap();
    let account = desk_account(&store, Some("Issue")).await;
    pull_fixtures(
        &ingestor(&store),
        &account,
        vec![mail("ann@example.com", "Kept", None, "x")],
    )
    .await
    .unwrap();

    service(&store).delete(account.id.unwrap()).await.unwrap();

    let entries = store.conversations().list().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].account_id.is_none());
    assert!(entries[0].reference.is_some());
    assert!(store.accounts().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn one_default_per_role() {
    let store = Store::in_memory().await.unwrap();
    let svc = service(&store);
    let ctx = Context::with_mode(RunMode::Install);

    let mut first = Account::with_email("one@example.com");
    first.outgoing.enabled = true;
    first.outgoing.host = "smtp.example.com".into();
    first.outgoing.port = 587;
    first.default_outgoing = true;
    svc.save(&mut first, &ctx).await.unwrap();

    let mut second = Account::with_email("two@example.com");
    second.outgoing = first.outgoing.clone();
    second.default_outgoing = true;
    svc.save(&mut second, &ctx).await.unwrap();

    let accounts = store.accounts().list().await.unwrap();
    assert_eq!(accounts.iter().filter(|a| a.default_outgoing).count(), 1);
    let default = store
        .accounts()
        .default_account(DefaultRole::Outgoing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(default.email, "two@example.com");
    assert!(store
        .accounts()
        .default_account(DefaultRole::Incoming)
        .await
        .unwrap()
        .is_none());
}

fn claiming_both_defaults(email: &str) -> Account {
    let mut account = Account::with_email(email);
    account.incoming.enabled = true;
    account.incoming.host = "pop.example.com".into();
    account.incoming.port = 995;
    account.outgoing.enabled = true;
    account.outgoing.host = "smtp.example.com".into();
    account.outgoing.port = 587;
    account.default_incoming = true;
    account.default_outgoing = true;
    account
}

#[tokio::test]
async fn concurrent_saves_leave_one_default_per_role() {
    let path = std::env::temp_dir().join(format!("threadline-defaults-{}.db", std::process::id()));
    let sidecars = ["", "-wal", "-shm"].map(|suffix| format!("{}{suffix}", path.display()));
    for file in &sidecars {
        let _ = std::fs::remove_file(file);
    }

    let store = Store::open(&path).await.unwrap();
    let svc = service(&store);
    let ctx = Context::with_mode(RunMode::Install);
    let mut a = claiming_both_defaults("a@example.com");
    let mut b = claiming_both_defaults("b@example.com");

    let (saved_a, saved_b) = tokio::join!(svc.save(&mut a, &ctx), svc.save(&mut b, &ctx));
    saved_a.unwrap();
    saved_b.unwrap();

    let ids = [a.id.unwrap(), b.id.unwrap()];
    for role in DefaultRole::ALL {
        let holders: Vec<i64> =
            sqlx::query_scalar("SELECT account_id FROM account_defaults WHERE role = ?")
                .bind(role.as_str())
                .fetch_all(store.pool())
                .await
                .unwrap();
        assert_eq!(holders.len(), 1, "{role:?}");
        assert!(ids.iter().any(|id| id.0 == holders[0]), "{role:?}");
        assert!(
            store
                .accounts()
                .default_account(role)
                .await
                .unwrap()
                .is_some()
        );
    }

    let accounts = store.accounts().list().await.unwrap();
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts.iter().filter(|a| a.default_incoming).count(), 1);
    assert_eq!(accounts.iter().filter(|a| a.default_outgoing).count(), 1);

    store.pool().close().await;
    for file in &sidecars {
        let _ = std::fs::remove_file(file);
    }
}

#[tokio::test]
async fn unknown_append_to_is_rejected() {
    let store = Store::in_memory().await.unwrap();
    let mut account = Account::with_email("desk@example.com");
    account.incoming.enabled = true;
    account.incoming.host = "pop.example.com".into();
    account.incoming.port = 995;
    account.append_to = Some("Ticket".into());

    let err = service(&store)
        .save(&mut account, &Context::test())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
    assert!(account.id.is_none());
}
