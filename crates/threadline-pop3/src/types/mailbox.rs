//! Mailbox listings returned in the TRANSACTION state.

/// Response to STAT: message count and total size in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// Number of messages in the maildrop.
    pub count: u32,
    /// Size of the maildrop in octets.
    pub size: u64,
}

/// One line of a LIST response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    /// Message number for this session.
    pub id: u32,
    /// Message size in octets.
    pub size: u64,
}

/// One line of a UIDL response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueId {
    /// Message number for this session.
    pub id: u32,
    /// Server-assigned identifier, stable across sessions.
    pub uid: String,
}
