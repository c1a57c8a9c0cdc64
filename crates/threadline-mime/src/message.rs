//! MIME message structure and handling.

use crate::address::{Address, parse_address_list};
use crate::content_type::{ContentDisposition, ContentType};
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Nesting limit for multipart trees; deeper parts are kept as opaque leaves.
const MAX_DEPTH: usize = 16;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
            Self::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// One node of a MIME tree.
///
/// Multipart nodes carry their sub-parts in `children` and keep the raw
/// multipart body (preamble included) in `body`.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (raw, still transfer-encoded).
    pub body: Vec<u8>,
    /// Sub-parts of a multipart node.
    pub children: Vec<Part>,
}

impl Part {
    /// Creates a leaf part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body,
            children: Vec::new(),
        }
    }

    fn parse(raw: &[u8], depth: usize) -> Self {
        let (header_text, body) = split_header_body(raw);
        let headers = Headers::parse(&header_text);
        let mut part = Self::new(headers, body.to_vec());

        let content_type = part.content_type();
        if content_type.is_multipart()
            && depth < MAX_DEPTH
            && let Some(boundary) = content_type.boundary()
        {
            part.children = split_multipart(body, boundary)
                .into_iter()
                .map(|section| Self::parse(section, depth + 1))
                .collect();
        }
        part
    }

    /// Gets the content type; a missing or unreadable header means `text/plain`.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.headers
            .get("content-type")
            .and_then(|ct| ContentType::parse(ct).ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Gets the content disposition if the header is present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is declared Base64 but is not.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Decodes the body, falling back to the raw bytes when decoding fails.
    #[must_use]
    pub fn decoded_body_lossy(&self) -> Vec<u8> {
        self.decode_body().unwrap_or_else(|_| self.body.clone())
    }

    /// Gets the decoded body as text in the declared charset.
    #[must_use]
    pub fn body_text(&self) -> String {
        let content_type = self.content_type();
        decode_charset(&self.decoded_body_lossy(), content_type.charset())
    }

    /// Returns the attachment filename from the disposition or the legacy
    /// content type `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename())
            .or_else(|| self.content_type().name())
            .filter(|n| !n.trim().is_empty())
    }

    /// Checks whether this leaf should be treated as an attachment rather
    /// than as message text.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        if !self.children.is_empty() {
            return false;
        }
        if self.disposition().is_some_and(|d| d.is_attachment()) {
            return true;
        }
        let content_type = self.content_type();
        if content_type.is_text() {
            return self.filename().is_some();
        }
        !content_type.is_multipart()
    }

    /// Iterates the leaf parts depth-first, in document order.
    pub fn leaves(&self) -> Box<dyn Iterator<Item = &Self> + '_> {
        if self.children.is_empty() {
            Box::new(std::iter::once(self))
        } else {
            Box::new(self.children.iter().flat_map(Self::leaves))
        }
    }
}

/// A decoded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename, or a generated `attachment-N` name when none was given.
    pub filename: String,
    /// `type/subtype` of the attachment.
    pub content_type: String,
    /// Decoded content bytes.
    pub content: Vec<u8>,
}

/// Parsed RFC 5322 message with its MIME tree.
#[derive(Debug, Clone)]
pub struct Message {
    root: Part,
}

impl Message {
    /// Parses a raw message.
    ///
    /// # Errors
    ///
    /// Returns an error when the input has no header block at all, or when
    /// the top-level content type is multipart without a boundary.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let root = Part::parse(raw, 0);
        if root.headers.is_empty() {
            return Err(Error::Parse("no header block found".to_string()));
        }
        let content_type = root.content_type();
        if content_type.is_multipart() && content_type.boundary().is_none() {
            return Err(Error::MissingBoundary);
        }
        Ok(Self { root })
    }

    /// Gets the message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Gets the root MIME part.
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }

    /// Gets the top-level content type.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.root.content_type()
    }

    fn addresses(&self, name: &str) -> Vec<Address> {
        self.root
            .headers
            .get_all(name)
            .into_iter()
            .flat_map(parse_address_list)
            .collect()
    }

    /// Gets the `From` addresses.
    #[must_use]
    pub fn from(&self) -> Vec<Address> {
        self.addresses("from")
    }

    /// Gets the `To` addresses.
    #[must_use]
    pub fn to(&self) -> Vec<Address> {
        self.addresses("to")
    }

    /// Gets the `Cc` addresses.
    #[must_use]
    pub fn cc(&self) -> Vec<Address> {
        self.addresses("cc")
    }

    /// Gets the decoded subject.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.root
            .headers
            .get_decoded("subject")
            .map(|s| s.trim().to_string())
    }

    /// Gets the Date header.
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.root.headers.get("date").map(str::trim)
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.root.headers.get("message-id").map(str::trim)
    }

    /// Gets the In-Reply-To header.
    #[must_use]
    pub fn in_reply_to(&self) -> Option<&str> {
        self.root.headers.get("in-reply-to").map(str::trim)
    }

    fn first_body(&self, sub_type: &str) -> Option<&Part> {
        self.root
            .leaves()
            .find(|leaf| leaf.content_type().is("text", sub_type) && !leaf.is_attachment())
    }

    /// Gets the first inline `text/plain` body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is declared Base64 but does not decode.
    pub fn text_body(&self) -> Result<Option<String>> {
        self.first_body("plain")
            .map(|part| {
                let bytes = part.decode_body()?;
                Ok(decode_charset(&bytes, part.content_type().charset()))
            })
            .transpose()
    }

    /// Gets the first inline `text/html` body.
    #[must_use]
    pub fn html_body(&self) -> Option<String> {
        self.first_body("html").map(Part::body_text)
    }

    /// Collects every attachment leaf with its decoded content.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.root
            .leaves()
            .filter(|leaf| leaf.is_attachment())
            .enumerate()
            .map(|(index, leaf)| Attachment {
                filename: leaf
                    .filename()
                    .unwrap_or_else(|| format!("attachment-{}", index + 1)),
                content_type: leaf.content_type().mime_type(),
                content: leaf.decoded_body_lossy(),
            })
            .collect()
    }
}

/// Splits at the first empty line; a message without one is all headers.
fn split_header_body(raw: &[u8]) -> (String, &[u8]) {
    let crlf = find(raw, b"\r\n\r\n").map(|pos| (pos, pos + 4));
    let lf = find(raw, b"\n\n").map(|pos| (pos, pos + 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((end, body_start)) => (
            String::from_utf8_lossy(&raw[..end]).into_owned(),
            &raw[body_start..],
        ),
        None => (String::from_utf8_lossy(raw).into_owned(), &[]),
    }
}

/// Returns the sections between boundary delimiter lines.
///
/// The line break preceding a delimiter belongs to the delimiter. Text
/// before the first delimiter and after the closing one is dropped.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut sections = Vec::new();
    let mut section_start: Option<usize> = None;
    let mut offset = 0;

    while offset < body.len() {
        let line_end = body[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(body.len(), |pos| offset + pos + 1);
        let line = trim_line_end(&body[offset..line_end]);

        if let Some(rest) = line.strip_prefix(delimiter.as_bytes()) {
            let closing = rest.starts_with(b"--");
            if closing || rest.iter().all(u8::is_ascii_whitespace) {
                if let Some(start) = section_start.take() {
                    sections.push(trim_line_end(&body[start..offset]));
                }
                if closing {
                    return sections;
                }
                section_start = Some(line_end);
            }
        }
        offset = line_end;
    }

    // unterminated multipart: keep what we have
    if let Some(start) = section_start {
        sections.push(&body[start..]);
    }
    sections
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
