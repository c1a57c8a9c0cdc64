//! Error types for POP3 operations.

use std::io;

/// Result type alias for POP3 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Server answered `-ERR`.
    #[error("POP3 error: {message}")]
    Pop3Error {
        /// Text following `-ERR`.
        message: String,
    },

    /// Server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Protocol error (unexpected or malformed response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server closed the connection mid-response.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// Feature not supported by server.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an error from the text of a `-ERR` reply.
    #[must_use]
    pub fn pop3_error(message: impl Into<String>) -> Self {
        Self::Pop3Error {
            message: message.into(),
        }
    }

    /// Returns true if the server refused a command (as opposed to a
    /// transport or protocol failure).
    #[must_use]
    pub const fn is_server_refusal(&self) -> bool {
        matches!(self, Self::Pop3Error { .. } | Self::AuthFailed(_))
    }
}
