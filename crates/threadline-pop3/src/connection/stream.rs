//! Low-level POP3 stream handling.
//!
//! POP3 is line oriented: every reply starts with a CRLF-terminated status
//! line, and multi-line replies end with a line holding a single `.`.
//! Message content is treated as bytes; servers send whatever charset the
//! message was written in.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Maximum line length to prevent memory exhaustion.
const MAX_LINE_LENGTH: usize = 1024 * 1024; // 1 MB

/// Maximum multi-line body size to prevent memory exhaustion.
const MAX_BODY_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// POP3 stream (TCP or TLS).
#[derive(Debug)]
pub enum Pop3Stream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl Pop3Stream {
    /// Reads one line, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the server hung up.
    pub async fn read_line(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Tcp(reader) => read_line(reader).await,
            Self::Tls(reader) => read_line(&mut **reader).await,
        }
    }

    /// Reads a dot-terminated multi-line body.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the body is too large.
    pub async fn read_multiline(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Tcp(reader) => read_multiline(reader).await,
            Self::Tls(reader) => read_multiline(&mut **reader).await,
        }
    }

    /// Writes data to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream already uses TLS or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };

        let tls_stream = handshake(hostname, tcp_stream).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }

    /// Returns true for TLS streams.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Reads one CRLF- or LF-terminated line from any buffered reader.
///
/// # Errors
///
/// Returns [`Error::ConnectionClosed`] at end of stream and a protocol error
/// for lines longer than 1 MB.
pub async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line).await?;
    if read == 0 {
        return Err(Error::ConnectionClosed);
    }
    if line.len() > MAX_LINE_LENGTH {
        return Err(Error::Protocol(format!(
            "line too long: {} bytes (max {MAX_LINE_LENGTH})",
            line.len()
        )));
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(line)
}

/// Reads a multi-line body up to the terminating `.` line, removing
/// dot-stuffing. Lines are rejoined with CRLF.
///
/// # Errors
///
/// Returns an error if the stream ends early or the body exceeds 100 MB.
pub async fn read_multiline<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::new();
    let mut first = true;
    loop {
        let line = read_line(reader).await?;
        if line == b"." {
            return Ok(body);
        }
        if !first {
            body.extend_from_slice(b"\r\n");
        }
        first = false;

        let line = line.strip_prefix(b".").unwrap_or(&line);
        body.extend_from_slice(line);

        if body.len() > MAX_BODY_SIZE {
            return Err(Error::Protocol(format!(
                "response too large (max {MAX_BODY_SIZE} bytes)"
            )));
        }
    }
}

/// Connects to a POP3 server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<Pop3Stream> {
    let addr = format!("{hostname}:{port}");
    let stream = TcpStream::connect(&addr).await?;
    Ok(Pop3Stream::Tcp(BufReader::new(stream)))
}

/// Connects to a POP3 server over TLS (implicit TLS on port 995).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<Pop3Stream> {
    let addr = format!("{hostname}:{port}");
    let tcp_stream = TcpStream::connect(&addr).await?;
    let tls_stream = handshake(hostname, tcp_stream).await?;
    Ok(Pop3Stream::Tls(Box::new(BufReader::new(tls_stream))))
}

async fn handshake(
    hostname: &str,
    tcp_stream: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let connector = create_tls_connector();
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;
    Ok(connector.connect(server_name, tcp_stream).await?)
}

/// Creates a TLS connector with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
