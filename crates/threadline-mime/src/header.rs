//! MIME header handling.

use crate::encoding::decode_rfc2047;

/// Header fields of a message or MIME part, in the order they appeared.
///
/// Names compare case-insensitively; values are kept raw (still RFC 2047
/// encoded) and decoded on demand.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First raw value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First value of `name` with RFC 2047 words decoded.
    #[must_use]
    pub fn get_decoded(&self, name: &str) -> Option<String> {
        self.get(name).map(decode_rfc2047)
    }

    /// Every raw value of `name`, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// True when the block has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields, repeated names counted once per occurrence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Parses a header block.
    ///
    /// Folded lines (starting with space or tab) are joined to the previous
    /// header. Lines that are not `Name: value` pairs, such as an mbox
    /// `From ` separator, are skipped. Parsing stops at the first empty line.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::new();
        let mut current_name: Option<String> = None;
        let mut current_value = String::new();

        for line in text.lines() {
            if line.is_empty() {
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                if current_name.is_some() {
                    current_value.push(' ');
                    current_value.push_str(line.trim());
                }
                continue;
            }

            if let Some(name) = current_name.take() {
                headers.add(name, current_value.trim().to_string());
                current_value.clear();
            }

            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if !name.is_empty() && !name.contains(char::is_whitespace) {
                    current_name = Some(name.to_string());
                    current_value = value.trim().to_string();
                }
            }
        }

        if let Some(name) = current_name {
            headers.add(name, current_value.trim().to_string());
        }

        headers
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert!(headers.get("Content").is_none());
    }

    #[test]
    fn test_repeated_fields_keep_order() {
        let headers = Headers::parse("Received: from a\nX-Other: 1\nreceived: from b\n");
        assert_eq!(headers.get_all("Received"), ["from a", "from b"]);
        assert_eq!(headers.get("RECEIVED"), Some("from a"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_values_outlive_lookup_name() {
        let headers = Headers::parse("Received: from a\nReceived: from b\nSubject: hi\n");
        let (first, all) = {
            let name = String::from("received");
            (headers.get(&name), headers.get_all(&name))
        };
        assert_eq!(first, Some("from a"));
        assert_eq!(all, ["from a", "from b"]);
    }

    #[test]
    fn test_headers_parse_folded() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "Subject: Test\r\n",
            "\tMessage\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("Body").is_none());
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_headers_parse_skips_mbox_separator() {
        let headers = Headers::parse("From alice@example.com Mon Jan  1 10:00:00 2024\nTo: bob@example.com\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("to"), Some("bob@example.com"));
    }

    #[test]
    fn test_headers_parse_garbage_is_empty() {
        assert!(Headers::parse("this is not a mail message at all").is_empty());
    }

    #[test]
    fn test_get_decoded() {
        let mut headers = Headers::new();
        headers.add("Subject", "=?utf-8?B?SMOpbGxv?= world");
        assert_eq!(headers.get_decoded("subject").as_deref(), Some("Héllo world"));
    }
}
