//! Shared fixtures for the ingestion integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use threadline_core::mailbox::Deletion;
use threadline_core::{
    Account, Context, DeliveryMode, EntryAttachment, Ingestor, MailboxConnector, MailboxError,
    MailboxSession, Mailer, OutboundMail, Pop3Connector, RawMessage, SendError, Store,
    ThreadResolver,
};

/// Builds a raw RFC 5322 message.
pub fn mail(from: &str, subject: &str, in_reply_to: Option<&str>, body: &str) -> RawMessage {
    let mut raw = format!("From: {from}\r\nTo: desk@example.com\r\nSubject: {subject}\r\n");
    if let Some(reference) = in_reply_to {
        raw.push_str(&format!("In-Reply-To: <{reference}>\r\n"));
    }
    raw.push_str("\r\n");
    raw.push_str(body);
    raw.push_str("\r\n");
    RawMessage::new(raw.into_bytes())
}

/// A saved desk account appending to `append_to`.
pub async fn desk_account(store: &Store, append_to: Option<&str>) -> Account {
    let mut account = Account::with_email("desk@example.com");
    account.name = "Desk".into();
    account.incoming.enabled = true;
    account.incoming.host = "pop.example.com".into();
    account.incoming.port = 995;
    account.outgoing.enabled = true;
    account.outgoing.host = "smtp.example.com".into();
    account.outgoing.port = 587;
    account.append_to = append_to.map(str::to_string);
    store.accounts().save(&mut account).await.unwrap();
    account
}

/// Ingestor that never touches the network.
pub fn ingestor(store: &Store) -> Ingestor {
    Ingestor::new(
        store.clone(),
        ThreadResolver::default(),
        Arc::new(Pop3Connector::new()),
        DeliveryMode::Destructive,
    )
}

/// Pulls `messages` through a test context.
pub async fn pull_fixtures(
    ingestor: &Ingestor,
    account: &Account,
    messages: Vec<RawMessage>,
) -> threadline_core::Result<threadline_core::PullReport> {
    let ctx = Context::test();
    ctx.inject_fixtures(account.id.unwrap(), messages);
    ingestor.pull(account, &ctx).await
}

/// One recorded send.
#[derive(Debug, Clone)]
pub struct Sent {
    pub mail: OutboundMail,
    pub attachments: Vec<EntryAttachment>,
    pub via: String,
}

/// Mailer that records instead of sending; optionally fails every send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Sent>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        mail: &OutboundMail,
        attachments: &[EntryAttachment],
        via: &Account,
    ) -> Result<(), SendError> {
        if self.fail {
            return Err(SendError::Configuration("relay down".into()));
        }
        self.sent.lock().unwrap().push(Sent {
            mail: mail.clone(),
            attachments: attachments.to_vec(),
            via: via.email.clone(),
        });
        Ok(())
    }

    async fn verify(&self, _: &Account) -> Result<(), SendError> {
        Ok(())
    }
}

/// In-memory mailbox shared between sessions, like a server maildrop.
#[derive(Debug, Default, Clone)]
pub struct MemoryMailbox {
    pub messages: Arc<Mutex<Vec<RawMessage>>>,
}

impl MemoryMailbox {
    pub fn with(messages: Vec<RawMessage>) -> Self {
        Self {
            messages: Arc::new(Mutex::new(messages)),
        }
    }

    pub fn remaining(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

struct MemorySession {
    mailbox: MemoryMailbox,
    fetched: Vec<usize>,
    skipped: Vec<usize>,
}

#[async_trait]
impl MailboxConnector for MemoryMailbox {
    async fn connect(&self, _: &Account) -> Result<Box<dyn MailboxSession>, MailboxError> {
        Ok(Box::new(MemorySession {
            mailbox: self.clone(),
            fetched: Vec::new(),
            skipped: Vec::new(),
        }))
    }
}

#[async_trait]
impl MailboxSession for MemorySession {
    async fn fetch(&mut self, skip: &HashSet<String>) -> Result<Vec<RawMessage>, MailboxError> {
        let messages = self.mailbox.messages.lock().unwrap().clone();
        let mut out = Vec::new();
        for (index, message) in messages.into_iter().enumerate() {
            if message.uid.as_ref().is_some_and(|uid| skip.contains(uid)) {
                self.skipped.push(index);
            } else {
                self.fetched.push(index);
                out.push(message);
            }
        }
        Ok(out)
    }

    async fn finish(self: Box<Self>, deletion: Deletion) -> Result<(), MailboxError> {
        let doomed: HashSet<usize> = match deletion {
            Deletion::All => self.fetched.iter().chain(&self.skipped).copied().collect(),
            Deletion::Only(positions) => positions
                .iter()
                .filter_map(|p| self.fetched.get(*p).copied())
                .chain(self.skipped.iter().copied())
                .collect(),
        };
        let mut messages = self.mailbox.messages.lock().unwrap();
        let kept = messages
            .drain(..)
            .enumerate()
            .filter(|(index, _)| !doomed.contains(index))
            .map(|(_, message)| message)
            .collect();
        *messages = kept;
        Ok(())
    }
}
