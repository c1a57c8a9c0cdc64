//! MIME content type and content disposition handling.

use crate::encoding::decode_rfc2047;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Creates a text/plain content type, the RFC 2045 default.
    #[must_use]
    pub fn text_plain() -> Self {
        let mut ct = Self::new("text", "plain");
        ct.parameters
            .insert("charset".to_string(), "us-ascii".to_string());
        ct
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns the legacy `name` parameter, used as a filename fallback.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.parameters.get("name").map(|n| decode_rfc2047(n))
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("text")
    }

    /// Checks for a specific `type/subtype`.
    #[must_use]
    pub fn is(&self, main_type: &str, sub_type: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type) && self.sub_type.eq_ignore_ascii_case(sub_type)
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = split_parameters(s).into_iter();

        let type_str = parts
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidContentType("Empty content type".to_string()))?;

        let (main_type, sub_type) = type_str
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {type_str}")))?;

        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(type_str.to_string()));
        }

        let mut content_type = Self::new(main_type, sub_type);
        content_type.parameters = parse_parameters(parts);
        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}

/// Disposition type from a `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed inline with the message.
    Inline,
    /// Separate attachment.
    Attachment,
    /// Any other token.
    Other(String),
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// Parameters (e.g., filename).
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a content disposition header value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut parts = split_parameters(s).into_iter();
        let kind = match parts.next().map(|k| k.trim().to_lowercase()).as_deref() {
            Some("inline") => DispositionKind::Inline,
            Some("attachment") => DispositionKind::Attachment,
            Some(other) => DispositionKind::Other(other.to_string()),
            None => DispositionKind::Other(String::new()),
        };

        Self {
            kind,
            parameters: parse_parameters(parts),
        }
    }

    /// Returns true for `attachment` dispositions.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == DispositionKind::Attachment
    }

    /// Returns the decoded filename parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.parameters
            .get("filename")
            .or_else(|| self.parameters.get("filename*"))
            .map(|n| decode_rfc2047(n))
    }
}

/// Splits a header value on `;`, ignoring separators inside quotes.
fn split_parameters(s: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                pieces.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&s[start..]);
    pieces
}

fn parse_parameters<'a>(params: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    for param in params {
        if let Some((key, value)) = param.trim().split_once('=') {
            let key = key.trim().to_lowercase();
            let mut value = value.trim().trim_matches('"').to_string();
            // RFC 2231 extended value: charset'lang'percent-encoded
            if key.ends_with('*')
                && let Some(encoded) = value.splitn(3, '\'').nth(2)
            {
                value = percent_decode(encoded);
            }
            parameters.insert(key, value);
        }
    }
    parameters
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(byte) = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
        {
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert!(ct.is("text", "plain"));
        assert_eq!(ct.mime_type(), "text/plain");
    }

    #[test]
    fn test_content_type_parse_quoted_boundary_with_semicolon() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part;123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part;123"));
    }

    #[test]
    fn test_content_type_missing_subtype() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("").is_err());
    }

    #[test]
    fn test_default_is_text_plain() {
        let ct = ContentType::text_plain();
        assert!(ct.is_text());
        assert_eq!(ct.charset(), Some("us-ascii"));
    }

    #[test]
    fn test_disposition_attachment_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"report.pdf\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename().as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_disposition_rfc2231_filename() {
        let cd = ContentDisposition::parse("attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf");
        assert_eq!(cd.filename().as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn test_disposition_inline() {
        let cd = ContentDisposition::parse("inline");
        assert_eq!(cd.kind, DispositionKind::Inline);
        assert!(cd.filename().is_none());
    }
}
