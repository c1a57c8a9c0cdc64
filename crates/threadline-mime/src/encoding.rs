//! MIME decoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 encoded words and the
//! every charset `mail-parser` knows (single-byte tables plus the
//! multi-byte CJK encodings).

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mail_parser::decoders::charsets::map::charset_decoder;

/// Decodes Base64 data, ignoring embedded whitespace and missing padding.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let mut cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    while cleaned.len() % 4 != 0 {
        cleaned.push('=');
    }
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Malformed escape sequences are kept literally rather than rejected.
#[must_use]
pub fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let byte = data[i];
        if byte != b'=' {
            result.push(byte);
            i += 1;
            continue;
        }

        // Soft line break
        let tail = &data[i + 1..];
        if tail.starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if tail.starts_with(b"\n") {
            i += 2;
            continue;
        }

        match data.get(i + 1..i + 3).and_then(hex_pair) {
            Some(decoded) => {
                result.push(decoded);
                i += 3;
            }
            None => {
                result.push(b'=');
                i += 1;
            }
        }
    }

    result
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// Converts bytes in the given charset to a `String`.
///
/// Unknown or missing charsets are read as UTF-8 with lossy replacement.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let label = charset
        .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
        .unwrap_or_default();
    if matches!(label.as_str(), "" | "utf-8" | "utf8" | "us-ascii" | "ascii") {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    charset_decoder(label.as_bytes())
        .map_or_else(|| String::from_utf8_lossy(bytes).into_owned(), |decode| decode(bytes))
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Format of a word: `=?charset?encoding?encoded-text?=`. Whitespace between
/// two adjacent encoded words is dropped, as the RFC requires. Words that
/// cannot be decoded are left untouched.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        if let Some((decoded, consumed)) = decode_word(candidate) {
            if !(after_word && before.trim().is_empty()) {
                out.push_str(before);
            }
            out.push_str(&decoded);
            rest = &candidate[consumed..];
            after_word = true;
        } else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    out.push_str(rest);
    out
}

/// Decodes one encoded word at the start of `candidate`.
///
/// Returns the decoded text and the number of bytes consumed.
fn decode_word(candidate: &str) -> Option<(String, usize)> {
    let inner = candidate.strip_prefix("=?")?;
    let (charset, after) = inner.split_once('?')?;
    let (encoding, after) = after.split_once('?')?;
    let end = after.find("?=")?;
    let payload = &after[..end];

    if charset.is_empty() || charset.contains(char::is_whitespace) || payload.contains(' ') {
        return None;
    }

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload).ok()?,
        "Q" | "q" => decode_quoted_printable(payload.replace('_', " ").as_bytes()),
        _ => return None,
    };

    // RFC 2231 language suffix: charset*lang
    let charset = charset.split('*').next().unwrap_or(charset);
    Some((decode_charset(&bytes, Some(charset)), consumed))
}
