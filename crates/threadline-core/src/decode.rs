//! Message decoder: raw RFC 5322 bytes to a [`NormalizedMessage`].

use thiserror::Error;
use threadline_mime::{Address, Message};

use crate::conversation::EntryAttachment;
use crate::render::html_to_text;

/// Subject used when a message has none.
pub const NO_SUBJECT: &str = "No Subject";

/// Why a raw message could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a parseable message.
    #[error("Malformed message: {0}")]
    Malformed(#[from] threadline_mime::Error),

    /// The message has no usable `From` address.
    #[error("Message has no sender")]
    MissingSender,
}

/// Decoded message, ready for threading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Subject, `"No Subject"` when absent.
    pub subject: String,
    /// Analysis text: the plain body, else text derived from the HTML body.
    pub text: String,
    /// Original HTML body, if any.
    pub html: Option<String>,
    /// Sender address.
    pub sender: String,
    /// Sender display name, if given.
    pub sender_name: Option<String>,
    /// `To` and `Cc` addresses.
    pub recipients: Vec<String>,
    /// `In-Reply-To` without whitespace or angle brackets; empty if absent.
    pub thread_reference: String,
    /// `Message-ID` as sent.
    pub message_id: Option<String>,
    /// Attachments with decoded content.
    pub attachments: Vec<EntryAttachment>,
}

impl NormalizedMessage {
    /// Decodes a raw message.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] when the bytes are not a message
    /// or the plain body does not decode, and [`DecodeError::MissingSender`]
    /// when there is no `From` address.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let message = Message::parse(raw)?;

        let Address { name, email } = message
            .from()
            .into_iter()
            .find(|a| !a.email.is_empty())
            .ok_or(DecodeError::MissingSender)?;

        let html = message.html_body();
        let text = match message.text_body()? {
            Some(text) => text,
            None => html.as_deref().map(html_to_text).unwrap_or_default(),
        };

        let subject = message
            .subject()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUBJECT.to_string());

        let recipients = message
            .to()
            .into_iter()
            .chain(message.cc())
            .map(|a| a.email)
            .filter(|e| !e.is_empty())
            .collect();

        let attachments = message
            .attachments()
            .into_iter()
            .map(|a| EntryAttachment {
                filename: a.filename,
                content_type: a.content_type,
                content: a.content,
            })
            .collect();

        Ok(Self {
            subject,
            text,
            html,
            sender: email,
            sender_name: name,
            recipients,
            thread_reference: thread_reference(message.in_reply_to()),
            message_id: message.message_id().map(str::to_string),
            attachments,
        })
    }
}

/// Strips whitespace and angle brackets from an `In-Reply-To` value.
#[must_use]
pub fn thread_reference(header: Option<&str>) -> String {
    header
        .unwrap_or_default()
        .trim_matches(|c: char| c.is_whitespace() || c == '<' || c == '>')
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_message() {
        let raw = b"From: \"Ann Smith\" <ann@example.com>\r\n\
To: desk@example.com\r\n\
Cc: Bob <bob@example.com>\r\n\
Subject: =?UTF-8?Q?Caf=C3=A9?= order\r\n\
In-Reply-To:  <abc123@desk.example.com> \r\n\
Message-ID: <m1@example.com>\r\n\
\r\n\
Where is my coffee?\r\n";

        let msg = NormalizedMessage::decode(raw).unwrap();
        assert_eq!(msg.subject, "Café order");
        assert_eq!(msg.sender, "ann@example.com");
        assert_eq!(msg.sender_name.as_deref(), Some("Ann Smith"));
        assert_eq!(msg.recipients, ["desk@example.com", "bob@example.com"]);
        assert_eq!(msg.thread_reference, "abc123@desk.example.com");
        assert_eq!(msg.message_id.as_deref(), Some("<m1@example.com>"));
        assert!(msg.text.contains("Where is my coffee?"));
        assert!(msg.html.is_none());
    }

    #[test]
    fn prefers_plain_text_but_keeps_html() {
        let raw = b"From: ann@example.com\r\n\
Subject: Both\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
plain words\r\n\
--b1\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html words</p>\r\n\
--b1--\r\n";

        let msg = NormalizedMessage::decode(raw).unwrap();
        assert!(msg.text.contains("plain words"));
        assert!(msg.html.unwrap().contains("<p>html words</p>"));
    }

    #[test]
    fn html_only_message_gets_derived_text() {
        let raw = b"From: ann@example.com\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>Hello <b>there</b></p>\r\n";

        let msg = NormalizedMessage::decode(raw).unwrap();
        assert_eq!(msg.subject, NO_SUBJECT);
        assert!(msg.text.contains("Hello"));
        assert!(!msg.text.contains("<p>"));
        assert_eq!(msg.thread_reference, "");
    }

    #[test]
    fn attachments_are_extracted() {
        let raw = b"From: ann@example.com\r\n\
Subject: Files\r\n\
Content-Type: multipart/mixed; boundary=XX\r\n\
\r\n\
--XX\r\n\
Content-Type: text/plain\r\n\
\r\n\
see attached\r\n\
--XX\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment; filename=\"data.bin\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
AAEC\r\n\
--XX--\r\n";

        let msg = NormalizedMessage::decode(raw).unwrap();
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename, "data.bin");
        assert_eq!(msg.attachments[0].content, [0, 1, 2]);
    }

    #[test]
    fn missing_sender_is_an_error() {
        let raw = b"To: desk@example.com\r\nSubject: anon\r\n\r\nhi\r\n";
        assert!(matches!(
            NormalizedMessage::decode(raw),
            Err(DecodeError::MissingSender)
        ));
    }

    #[test]
    fn broken_multipart_is_malformed() {
        let raw = b"From: ann@example.com\r\nContent-Type: multipart/mixed\r\n\r\nbody\r\n";
        assert!(matches!(
            NormalizedMessage::decode(raw),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn thread_reference_trimming() {
        assert_eq!(thread_reference(Some(" <x@y> ")), "x@y");
        assert_eq!(thread_reference(Some("plain")), "plain");
        assert_eq!(thread_reference(None), "");
    }

    proptest::proptest! {
        #[test]
        fn decode_never_panics(raw in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..512)) {
            let _ = NormalizedMessage::decode(&raw);
        }

        #[test]
        fn thread_reference_has_no_brackets_at_edges(header in "[ <>a-z0-9@.]{0,32}") {
            let reference = thread_reference(Some(&header));
            proptest::prop_assert!(!reference.starts_with(['<', '>', ' ']));
            proptest::prop_assert!(!reference.ends_with(['<', '>', ' ']));
        }
    }
}
