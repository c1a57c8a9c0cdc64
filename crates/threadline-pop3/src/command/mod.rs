//! POP3 command builder.

use std::fmt;

/// POP3 command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPA - List capabilities
    Capa,
    /// STLS - Upgrade to TLS
    Stls,
    /// USER - Name the maildrop
    User(String),
    /// PASS - Password for the maildrop
    Pass(String),
    /// STAT - Maildrop size
    Stat,
    /// LIST - Message sizes, for one message or all
    List(Option<u32>),
    /// UIDL - Unique identifiers, for one message or all
    Uidl(Option<u32>),
    /// RETR - Retrieve a message
    Retr(u32),
    /// DELE - Mark a message as deleted
    Dele(u32),
    /// RSET - Unmark deleted messages
    Rset,
    /// NOOP - No operation
    Noop,
    /// QUIT - Enter UPDATE state and close
    Quit,
}

impl Command {
    /// Serializes the command to bytes, CRLF included.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = self.keyword().to_string();
        match self {
            Self::User(arg) | Self::Pass(arg) => {
                line.push(' ');
                line.push_str(arg);
            }
            Self::List(Some(id)) | Self::Uidl(Some(id)) | Self::Retr(id) | Self::Dele(id) => {
                line.push(' ');
                line.push_str(&id.to_string());
            }
            _ => {}
        }
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Returns the command keyword.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Capa => "CAPA",
            Self::Stls => "STLS",
            Self::User(_) => "USER",
            Self::Pass(_) => "PASS",
            Self::Stat => "STAT",
            Self::List(_) => "LIST",
            Self::Uidl(_) => "UIDL",
            Self::Retr(_) => "RETR",
            Self::Dele(_) => "DELE",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }

    /// Returns true if a successful reply is followed by a dot-terminated
    /// multi-line body.
    #[must_use]
    pub const fn is_multiline(&self) -> bool {
        matches!(
            self,
            Self::Capa | Self::List(None) | Self::Uidl(None) | Self::Retr(_)
        )
    }
}

// Keeps passwords out of logs.
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => f.write_str("PASS ****"),
            Self::User(user) => write!(f, "USER {user}"),
            Self::List(Some(id)) | Self::Uidl(Some(id)) | Self::Retr(id) | Self::Dele(id) => {
                write!(f, "{} {id}", self.keyword())
            }
            _ => f.write_str(self.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_simple() {
        assert_eq!(Command::Capa.serialize(), b"CAPA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
        assert_eq!(Command::List(None).serialize(), b"LIST\r\n");
    }

    #[test]
    fn test_serialize_with_arguments() {
        assert_eq!(
            Command::User("support@example.com".into()).serialize(),
            b"USER support@example.com\r\n"
        );
        assert_eq!(Command::Retr(7).serialize(), b"RETR 7\r\n");
        assert_eq!(Command::Uidl(Some(3)).serialize(), b"UIDL 3\r\n");
    }

    #[test]
    fn test_debug_masks_password() {
        let debug = format!("{:?}", Command::Pass("hunter2".into()));
        assert_eq!(debug, "PASS ****");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_multiline_commands() {
        assert!(Command::Retr(1).is_multiline());
        assert!(Command::List(None).is_multiline());
        assert!(!Command::List(Some(1)).is_multiline());
        assert!(!Command::Dele(1).is_multiline());
    }
}
