//! POP3 response parsers.

use crate::error::{Error, Result};
use crate::types::{Listing, Reply, Stat, Status, UniqueId};

/// Parses a status line (`+OK text` or `-ERR text`).
///
/// # Errors
///
/// Returns an error if the line starts with neither indicator.
pub fn parse_status_line(line: &str) -> Result<Reply> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (status, rest) = if let Some(rest) = line.strip_prefix("+OK") {
        (Status::Ok, rest)
    } else if let Some(rest) = line.strip_prefix("-ERR") {
        (Status::Err, rest)
    } else {
        return Err(Error::Protocol(format!("Malformed status line: {line}")));
    };

    // "+OKAY" is not a status indicator
    if !rest.is_empty() && !rest.starts_with(' ') {
        return Err(Error::Protocol(format!("Malformed status line: {line}")));
    }

    Ok(Reply::new(status, rest.trim()))
}

/// Parses the text of a STAT reply: `count size`.
///
/// # Errors
///
/// Returns an error if either number is missing or invalid.
pub fn parse_stat(text: &str) -> Result<Stat> {
    let mut fields = text.split_whitespace();
    let count = parse_number(fields.next(), text)?;
    let size = parse_number(fields.next(), text)?;
    Ok(Stat { count, size })
}

/// Parses a scan listing: `id size`.
///
/// # Errors
///
/// Returns an error if either number is missing or invalid.
pub fn parse_listing(line: &str) -> Result<Listing> {
    let mut fields = line.split_whitespace();
    let id = parse_number(fields.next(), line)?;
    let size = parse_number(fields.next(), line)?;
    Ok(Listing { id, size })
}

/// Parses a unique-id listing: `id uid`.
///
/// # Errors
///
/// Returns an error if the id is invalid or the uid is missing.
pub fn parse_unique_id(line: &str) -> Result<UniqueId> {
    let mut fields = line.split_whitespace();
    let id = parse_number(fields.next(), line)?;
    let uid = fields
        .next()
        .ok_or_else(|| Error::Protocol(format!("Missing unique id: {line}")))?;
    Ok(UniqueId {
        id,
        uid: uid.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(field: Option<&str>, line: &str) -> Result<T> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("Malformed listing: {line}")))
}
