//! POP3 capabilities advertised in response to CAPA (RFC 2449).

use std::fmt;

/// A capability line from a CAPA response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// TOP command.
    Top,
    /// USER/PASS authentication.
    User,
    /// SASL authentication with the listed mechanisms.
    Sasl(Vec<String>),
    /// Extended response codes in `-ERR` replies.
    RespCodes,
    /// Server may lock mailboxes for the given number of seconds.
    LoginDelay(Option<u32>),
    /// Server pipelines commands.
    Pipelining,
    /// Minimum days messages stay on the server (`NEVER` maps to `None`).
    Expire(Option<u32>),
    /// UIDL command.
    Uidl,
    /// Server implementation string.
    Implementation(String),
    /// STLS command (RFC 2595).
    Stls,
    /// Anything else.
    Other(String),
}

impl Capability {
    /// Parses one capability line.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_uppercase();
        let args: Vec<&str> = words.collect();

        match keyword.as_str() {
            "TOP" => Self::Top,
            "USER" => Self::User,
            "SASL" => Self::Sasl(args.iter().map(|m| m.to_uppercase()).collect()),
            "RESP-CODES" => Self::RespCodes,
            "LOGIN-DELAY" => Self::LoginDelay(args.first().and_then(|d| d.parse().ok())),
            "PIPELINING" => Self::Pipelining,
            "EXPIRE" => Self::Expire(args.first().and_then(|d| d.parse().ok())),
            "UIDL" => Self::Uidl,
            "IMPLEMENTATION" => Self::Implementation(args.join(" ")),
            "STLS" => Self::Stls,
            _ => Self::Other(line.trim().to_string()),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("TOP"),
            Self::User => f.write_str("USER"),
            Self::Sasl(mechanisms) => write!(f, "SASL {}", mechanisms.join(" ")),
            Self::RespCodes => f.write_str("RESP-CODES"),
            Self::LoginDelay(Some(d)) => write!(f, "LOGIN-DELAY {d}"),
            Self::LoginDelay(None) => f.write_str("LOGIN-DELAY"),
            Self::Pipelining => f.write_str("PIPELINING"),
            Self::Expire(Some(d)) => write!(f, "EXPIRE {d}"),
            Self::Expire(None) => f.write_str("EXPIRE NEVER"),
            Self::Uidl => f.write_str("UIDL"),
            Self::Implementation(s) => write!(f, "IMPLEMENTATION {s}"),
            Self::Stls => f.write_str("STLS"),
            Self::Other(s) => f.write_str(s),
        }
    }
}
