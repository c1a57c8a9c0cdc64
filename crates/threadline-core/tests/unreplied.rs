//! Unreplied sweep scenarios.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::{Duration, Utc};
use common::{desk_account, ingestor, mail, pull_fixtures};
use threadline_core::case::CaseRepository;
use threadline_core::outbox::OutboxStatus;
use threadline_core::{Account, CaseStatus, MailPurpose, Store, UnrepliedNotifier};

async fn watched_desk(store: &Store) -> Account {
    let mut account = desk_account(store, Some("Issue")).await;
    account.unreplied.enabled = true;
    account.unreplied.recipients = "lead@example.com,\nops@example.com".into();
    account.unreplied.minutes = Some(30);
    store.accounts().save(&mut account).await.unwrap();
    account
}

async fn alerts(store: &Store) -> usize {
    store
        .outbox()
        .list(Some(OutboxStatus::Pending))
        .await
        .unwrap()
        .iter()
        .filter(|item| item.mail.purpose == MailPurpose::UnrepliedAlert)
        .count()
}

#[tokio::test]
async fn open_case_is_alerted_once() {
    let store = Store::in_memory().await.unwrap();
    let account = watched_desk(&store).await;
    pull_fixtures(
        &ingestor(&store),
        &account,
        vec![mail("ann@example.com", "Waiting", None, "anyone there?")],
    )
    .await
    .unwrap();

    let notifier = UnrepliedNotifier::new(store.clone(), Some(3));
    let later = Utc::now() + Duration::minutes(60);

    let report = notifier.sweep_at(later).await.unwrap();
    assert_eq!(report.accounts, 1);
    assert_eq!(report.examined, 1);
    assert_eq!(report.notified, 1);
    assert_eq!(alerts(&store).await, 1);

    let item = store.outbox().list(None).await.unwrap().pop().unwrap();
    assert_eq!(item.mail.recipients, ["lead@example.com", "ops@example.com"]);
    assert_eq!(item.mail.subject, "Waiting");
    assert!(item.mail.bulk);

    let again = notifier.sweep_at(later).await.unwrap();
    assert_eq!(again.examined, 0);
    assert_eq!(alerts(&store).await, 1);

    let entry = store.conversations().list().await.unwrap().remove(0);
    assert!(entry.unreplied_notification_sent);
}

#[tokio::test]
async fn entries_inside_the_window_wait() {
    let store = Store::in_memory().await.unwrap();
    let account = watched_desk(&store).await;
    pull_fixtures(
        &ingestor(&store),
        &account,
        vec![mail("ann@example.com", "Fresh", None, "x")],
    )
    .await
    .unwrap();

    let notifier = UnrepliedNotifier::new(store.clone(), Some(3));
    let report = notifier
        .sweep_at(Utc::now() + Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(report.examined, 0);
    assert_eq!(alerts(&store).await, 0);
}

#[tokio::test]
async fn lookback_bounds_old_entries() {
    let store = Store::in_memory().await.unwrap();
    let account = watched_desk(&store).await;
    pull_fixtures(
        &ingestor(&store),
        &account,
        vec![mail("ann@example.com", "Ancient", None, "x")],
    )
    .await
    .unwrap();
    let far_future = Utc::now() + Duration::days(2);

    let bounded = UnrepliedNotifier::new(store.clone(), Some(3));
    assert_eq!(bounded.sweep_at(far_future).await.unwrap().examined, 0);

    let unbounded = UnrepliedNotifier::new(store.clone(), None);
    assert_eq!(unbounded.sweep_at(far_future).await.unwrap().notified, 1);
}

#[tokio::test]
async fn closed_case_is_flagged_without_alert() {
    let store = Store::in_memory().await.unwrap();
    let account = watched_desk(&store).await;
    pull_fixtures(
        &ingestor(&store),
        &account,
        vec![mail("ann@example.com", "Solved", None, "x")],
    )
    .await
    .unwrap();
    let entry = store.conversations().list().await.unwrap().remove(0);
    {
        let mut conn = store.pool().acquire().await.unwrap();
        CaseRepository::set_status(&mut conn, entry.reference.unwrap().id, &CaseStatus::Closed)
            .await
            .unwrap();
    }

    let notifier = UnrepliedNotifier::new(store.clone(), Some(3));
    let later = Utc::now() + Duration::minutes(60);
    let report = notifier.sweep_at(later).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.notified, 0);
    assert_eq!(alerts(&store).await, 0);
    assert_eq!(notifier.sweep_at(later).await.unwrap().examined, 0);
}

#[tokio::test]
async fn accounts_not_watching_are_skipped() {
    let store = Store::in_memory().await.unwrap();
    let account = desk_account(&store, Some("Issue")).await;
    pull_fixtures(
        &ingestor(&store),
        &account,
        vec![mail("ann@example.com", "Quiet", None, "x")],
    )
    .await
    .unwrap();

    let notifier = UnrepliedNotifier::new(store.clone(), Some(3));
    let report = notifier
        .sweep_at(Utc::now() + Duration::minutes(60))
        .await
        .unwrap();
    assert_eq!(report.accounts, 0);
    assert_eq!(alerts(&store).await, 0);
}
