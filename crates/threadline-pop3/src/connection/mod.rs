//! POP3 connection management with type-state pattern.

mod client;
mod stream;

pub use client::{Authorization, Client, Pop3Connection, Transaction};
pub use stream::{Pop3Stream, connect, connect_tls, read_line, read_multiline};

use crate::error::Result;
use crate::types::Capability;

/// Transport security for a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Implicit TLS from the first byte (port 995).
    #[default]
    Tls,
    /// Plain TCP upgraded with STLS before login.
    StartTls,
    /// Plain TCP, no encryption.
    None,
}

/// Server details gathered before login.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Greeting text after `+OK`.
    pub greeting: String,
    /// Capabilities from the last CAPA response (empty if CAPA is unsupported).
    pub capabilities: Vec<Capability>,
}

impl ServerInfo {
    /// Checks if the server advertised a capability.
    #[must_use]
    pub fn supports(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Checks if STLS is supported.
    #[must_use]
    pub fn supports_stls(&self) -> bool {
        self.supports(&Capability::Stls)
    }

    /// Checks if UIDL is supported.
    #[must_use]
    pub fn supports_uidl(&self) -> bool {
        self.supports(&Capability::Uidl)
    }

    /// Returns the server implementation string, if advertised.
    #[must_use]
    pub fn implementation(&self) -> Option<&str> {
        self.capabilities.iter().find_map(|cap| match cap {
            Capability::Implementation(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// Connects with the requested security, reads the greeting and the
/// capability list.
///
/// # Errors
///
/// Returns an error if connecting, the TLS handshake, or the greeting fails.
pub async fn open(hostname: &str, port: u16, security: Security) -> Result<Client<Authorization>> {
    let stream = match security {
        Security::Tls => connect_tls(hostname, port).await?,
        Security::StartTls | Security::None => connect(hostname, port).await?,
    };

    let client = Client::from_stream(stream).await?.capa().await?;
    if security == Security::StartTls {
        return client.stls(hostname).await;
    }
    Ok(client)
}
