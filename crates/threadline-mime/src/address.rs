//! Mailbox address parsing for `From`, `To` and `Cc` headers.

use crate::encoding::decode_rfc2047;
use std::fmt;

/// A single mailbox: optional display name plus address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Decoded display name, if one was given.
    pub name: Option<String>,
    /// Bare address (`local@domain`), lowercased domain not enforced.
    pub email: String,
}

impl Address {
    /// Creates an address without a display name.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Parses a single mailbox such as `"Alice" <alice@example.com>`,
    /// `alice@example.com (Alice)` or a bare address.
    ///
    /// Returns `None` when no address can be found.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Some(open) = input.rfind('<')
            && let Some(close) = input[open..].find('>')
        {
            let email = input[open + 1..open + close].trim().to_string();
            if email.is_empty() {
                return None;
            }
            let name = clean_display_name(&input[..open]);
            return Some(Self { name, email });
        }

        // addr-spec with optional trailing comment
        let (email, comment) = match input.find('(') {
            Some(pos) => {
                let comment = input[pos + 1..].trim_end_matches(')');
                (input[..pos].trim(), clean_display_name(comment))
            }
            None => (input, None),
        };
        if email.is_empty() || !email.contains('@') {
            return None;
        }

        Some(Self {
            name: comment,
            email: email.to_string(),
        })
    }

    /// Returns the display name, falling back to the local part of the address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{name}\" <{}>", self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

fn clean_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('"').trim();
    if trimmed.is_empty() {
        return None;
    }
    let decoded = decode_rfc2047(&trimmed.replace("\\\"", "\""));
    Some(decoded.trim().to_string()).filter(|n| !n.is_empty())
}

/// Parses an address list header value.
///
/// Commas inside quoted strings, angle brackets and comments do not split.
/// Group syntax (`team: a@x, b@y;`) is flattened into its members.
/// Entries without a usable address are skipped.
#[must_use]
pub fn parse_address_list(input: &str) -> Vec<Address> {
    let mut addresses = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut comment_depth = 0usize;
    let mut escaped = false;

    for ch in input.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                current.push(ch);
            }
            '<' if !in_quotes && comment_depth == 0 => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes && comment_depth == 0 => {
                in_angle = false;
                current.push(ch);
            }
            // group display name ends here; drop it
            ':' if !in_quotes && !in_angle && comment_depth == 0 => current.clear(),
            ',' | ';' if !in_quotes && !in_angle && comment_depth == 0 => {
                addresses.extend(Address::parse(&current));
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    addresses.extend(Address::parse(&current));
    addresses
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_angle_address() {
        let addr = Address::parse("\"Doe, Jane\" <jane@example.com>").unwrap();
        assert_eq!(addr.name.as_deref(), Some("Doe, Jane"));
        assert_eq!(addr.email, "jane@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let addr = Address::parse("  bob@example.com ").unwrap();
        assert!(addr.name.is_none());
        assert_eq!(addr.display_name(), "bob");
    }

    #[test]
    fn test_parse_comment_name() {
        let addr = Address::parse("carol@example.com (Carol C)").unwrap();
        assert_eq!(addr.name.as_deref(), Some("Carol C"));
        assert_eq!(addr.email, "carol@example.com");
    }

    #[test]
    fn test_parse_encoded_name() {
        let addr = Address::parse("=?utf-8?Q?Ren=C3=A9?= <rene@example.com>").unwrap();
        assert_eq!(addr.name.as_deref(), Some("René"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Address::parse("").is_none());
        assert!(Address::parse("undisclosed recipients").is_none());
        assert!(Address::parse("<>").is_none());
    }

    #[test]
    fn test_address_list_with_quoted_commas() {
        let list = parse_address_list(
            "\"Doe, Jane\" <jane@example.com>, bob@example.com,\r\n carol@example.com (Carol, C)",
        );
        let emails: Vec<_> = list.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(
            emails,
            ["jane@example.com", "bob@example.com", "carol@example.com"]
        );
    }

    #[test]
    fn test_address_list_group_syntax() {
        let list = parse_address_list("team: a@example.com, b@example.com;, c@example.com");
        let emails: Vec<_> = list.iter().map(|a| a.email.as_str()).collect();
        assert_eq!(emails, ["a@example.com", "b@example.com", "c@example.com"]);
    }

    #[test]
    fn test_address_list_empty_group() {
        assert!(parse_address_list("undisclosed-recipients:;").is_empty());
    }
}
