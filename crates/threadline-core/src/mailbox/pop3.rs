//! POP3-backed mailbox sessions.

use std::collections::HashSet;

use async_trait::async_trait;
use threadline_pop3::connection::open;
use threadline_pop3::{Client, Error as Pop3Error, Security as Pop3Security, Transaction};
use tracing::{debug, info};

use super::{Deletion, MailboxConnector, MailboxError, MailboxSession, RawMessage};
use crate::account::{Account, Security};

/// Live connector for POP3 mailboxes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pop3Connector;

impl Pop3Connector {
    /// Creates a connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

const fn pop3_security(security: Security) -> Pop3Security {
    match security {
        Security::Tls => Pop3Security::Tls,
        Security::StartTls => Pop3Security::StartTls,
        Security::None => Pop3Security::None,
    }
}

#[async_trait]
impl MailboxConnector for Pop3Connector {
    async fn connect(&self, account: &Account) -> Result<Box<dyn MailboxSession>, MailboxError> {
        let config = &account.incoming;
        if config.host.trim().is_empty() {
            return Err(MailboxError::Configuration(format!(
                "POP3 server is required for {}",
                account.email
            )));
        }
        if config.port == 0 {
            return Err(MailboxError::Configuration(format!(
                "POP3 port is required for {}",
                account.email
            )));
        }

        debug!(host = %config.host, port = config.port, "Connecting to POP3 server");
        let client = open(&config.host, config.port, pop3_security(config.security))
            .await
            .map_err(MailboxError::Connection)?;
        let client = client
            .login(account.incoming_login(), &config.password)
            .await
            .map_err(|e| match e {
                Pop3Error::AuthFailed(msg) => MailboxError::Authentication(msg),
                other => MailboxError::Connection(other),
            })?;

        Ok(Box::new(Pop3Session {
            client,
            fetched: Vec::new(),
            skipped: Vec::new(),
        }))
    }
}

struct Pop3Session {
    client: Client<Transaction>,
    /// Message numbers of the fetch result, by position.
    fetched: Vec<u32>,
    /// Message numbers skipped as already processed.
    skipped: Vec<u32>,
}

#[async_trait]
impl MailboxSession for Pop3Session {
    async fn fetch(&mut self, skip: &HashSet<String>) -> Result<Vec<RawMessage>, MailboxError> {
        let listing = self.client.list().await.map_err(MailboxError::Fetch)?;

        // servers without CAPA may still answer UIDL
        let uids = match self.client.uidl().await {
            Ok(uids) => uids,
            Err(Pop3Error::NotSupported(_)) => {
                debug!("Server has no UIDL; processed markers are unavailable");
                Vec::new()
            }
            Err(e) => return Err(MailboxError::Fetch(e)),
        };

        let mut messages = Vec::with_capacity(listing.len());
        for entry in listing {
            let uid = uids.iter().find(|u| u.id == entry.id).map(|u| u.uid.clone());
            if uid.as_ref().is_some_and(|uid| skip.contains(uid)) {
                self.skipped.push(entry.id);
                continue;
            }

            let bytes = self.client.retr(entry.id).await.map_err(MailboxError::Fetch)?;
            self.fetched.push(entry.id);
            messages.push(RawMessage { uid, bytes });
        }

        info!(
            fetched = messages.len(),
            skipped = self.skipped.len(),
            "Fetched messages from POP3 mailbox"
        );
        Ok(messages)
    }

    async fn finish(self: Box<Self>, deletion: Deletion) -> Result<(), MailboxError> {
        let Self {
            mut client,
            fetched,
            skipped,
        } = *self;

        let doomed: Vec<u32> = match deletion {
            Deletion::All => fetched.iter().chain(&skipped).copied().collect(),
            Deletion::Only(positions) => positions
                .iter()
                .filter_map(|&pos| fetched.get(pos).copied())
                .chain(skipped.iter().copied())
                .collect(),
        };

        for id in &doomed {
            client.dele(*id).await.map_err(MailboxError::Fetch)?;
        }
        client.quit().await.map_err(MailboxError::Fetch)?;
        debug!(deleted = doomed.len(), "POP3 session closed");
        Ok(())
    }
}
