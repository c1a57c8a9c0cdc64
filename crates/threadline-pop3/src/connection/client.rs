//! Type-state POP3 client.

use super::{Pop3Stream, ServerInfo};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{parse_listing, parse_stat, parse_status_line, parse_unique_id};
use crate::types::{Capability, Listing, Reply, Stat, UniqueId};
use std::marker::PhantomData;
use tracing::debug;

/// Type-state marker for the AUTHORIZATION state.
#[derive(Debug)]
pub struct Authorization;

/// Type-state marker for the TRANSACTION state.
#[derive(Debug)]
pub struct Transaction;

/// POP3 client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: Pop3Stream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait Pop3Connection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> Pop3Connection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Authorization> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: Pop3Stream) -> Result<Self> {
        let greeting = Self::read_reply(&mut stream).await?;
        if !greeting.is_ok() {
            return Err(Error::pop3_error(greeting.text));
        }

        Ok(Self {
            stream,
            server_info: ServerInfo {
                greeting: greeting.text,
                capabilities: Vec::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends CAPA and records the server capabilities.
    ///
    /// Servers without CAPA answer `-ERR`; that leaves the list empty.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or protocol failure.
    pub async fn capa(mut self) -> Result<Self> {
        let reply = self.send_command(&Command::Capa).await?;
        if !reply.is_ok() {
            debug!(reply = %reply, "server does not support CAPA");
            self.server_info.capabilities.clear();
            return Ok(self);
        }

        let body = self.stream.read_multiline().await?;
        self.server_info.capabilities = lines(&body)
            .filter(|line| !line.trim().is_empty())
            .map(|line| Capability::parse(&line))
            .collect();
        Ok(self)
    }

    /// Upgrades the connection to TLS using STLS, then refreshes capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if STLS is not supported or if the upgrade fails.
    pub async fn stls(mut self, hostname: &str) -> Result<Self> {
        if !self.server_info.supports_stls() {
            return Err(Error::NotSupported("STLS".into()));
        }

        let reply = self.send_command(&Command::Stls).await?;
        if !reply.is_ok() {
            return Err(Error::pop3_error(reply.text));
        }

        self.stream = self.stream.upgrade_to_tls(hostname).await?;
        // RFC 2595: capabilities must be discarded after the upgrade
        self.capa().await
    }

    /// Authenticates with USER/PASS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthFailed`] if the server rejects the user or password.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<Transaction>> {
        let reply = self.send_command(&Command::User(username.to_string())).await?;
        if !reply.is_ok() {
            return Err(Error::AuthFailed(reply.text));
        }

        let reply = self
            .send_command(&Command::Pass(password.to_string()))
            .await?;
        if !reply.is_ok() {
            return Err(Error::AuthFailed(reply.text));
        }

        debug!(user = username, "POP3 login succeeded");
        Ok(Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        })
    }

    /// Sends QUIT without entering the UPDATE state.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        Self::expect_ok(reply).map(drop)
    }
}

impl Client<Transaction> {
    /// Returns the message count and maildrop size.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses or the reply is malformed.
    pub async fn stat(&mut self) -> Result<Stat> {
        let reply = self.send_command(&Command::Stat).await?;
        let reply = Self::expect_ok(reply)?;
        parse_stat(&reply.text)
    }

    /// Lists every message that is not marked deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses or a listing is malformed.
    pub async fn list(&mut self) -> Result<Vec<Listing>> {
        let reply = self.send_command(&Command::List(None)).await?;
        Self::expect_ok(reply)?;
        let body = self.stream.read_multiline().await?;
        lines(&body)
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_listing(&line))
            .collect()
    }

    /// Lists unique identifiers for every message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server refuses UIDL.
    pub async fn uidl(&mut self) -> Result<Vec<UniqueId>> {
        let reply = self.send_command(&Command::Uidl(None)).await?;
        if !reply.is_ok() {
            return Err(Error::NotSupported("UIDL".into()));
        }
        let body = self.stream.read_multiline().await?;
        lines(&body)
            .filter(|line| !line.trim().is_empty())
            .map(|line| parse_unique_id(&line))
            .collect()
    }

    /// Retrieves a full message as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the message does not exist or the read fails.
    pub async fn retr(&mut self, id: u32) -> Result<Vec<u8>> {
        let reply = self.send_command(&Command::Retr(id)).await?;
        Self::expect_ok(reply)?;
        self.stream.read_multiline().await
    }

    /// Marks a message as deleted. Deletion happens on [`Client::quit`].
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses.
    pub async fn dele(&mut self, id: u32) -> Result<()> {
        let reply = self.send_command(&Command::Dele(id)).await?;
        Self::expect_ok(reply).map(drop)
    }

    /// Unmarks all messages marked as deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses.
    pub async fn rset(&mut self) -> Result<()> {
        let reply = self.send_command(&Command::Rset).await?;
        Self::expect_ok(reply).map(drop)
    }

    /// Keeps the session alive.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses.
    pub async fn noop(&mut self) -> Result<()> {
        let reply = self.send_command(&Command::Noop).await?;
        Self::expect_ok(reply).map(drop)
    }

    /// Enters the UPDATE state, which removes messages marked as deleted,
    /// and closes the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server could not remove every marked message.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        Self::expect_ok(reply).map(drop)
    }
}

// Common implementation for all states
impl<S> Client<S> {
    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        debug!(command = ?cmd, "POP3 >>");
        self.stream.write_all(&cmd.serialize()).await?;
        Self::read_reply(&mut self.stream).await
    }

    async fn read_reply(stream: &mut Pop3Stream) -> Result<Reply> {
        let line = stream.read_line().await?;
        let reply = parse_status_line(&String::from_utf8_lossy(&line))?;
        debug!(reply = %reply, "POP3 <<");
        Ok(reply)
    }

    fn expect_ok(reply: Reply) -> Result<Reply> {
        if reply.is_ok() {
            Ok(reply)
        } else {
            Err(Error::pop3_error(reply.text))
        }
    }
}

fn lines(body: &[u8]) -> impl Iterator<Item = String> + '_ {
    body.split(|&b| b == b'\n')
        .map(|line| String::from_utf8_lossy(line).trim_end_matches('\r').to_string())
}
