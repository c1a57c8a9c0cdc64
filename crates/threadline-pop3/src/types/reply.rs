//! POP3 status replies.

use std::fmt;

/// Status indicator of a POP3 reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `+OK`
    Ok,
    /// `-ERR`
    Err,
}

/// A single-line POP3 status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Status indicator.
    pub status: Status,
    /// Text after the status indicator, possibly empty.
    pub text: String,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    pub fn new(status: Status, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Returns true for `+OK` replies.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indicator = match self.status {
            Status::Ok => "+OK",
            Status::Err => "-ERR",
        };
        if self.text.is_empty() {
            f.write_str(indicator)
        } else {
            write!(f, "{indicator} {}", self.text)
        }
    }
}
