//! Account model types.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Unreplied window used when an account leaves it unset or zero.
pub const DEFAULT_UNREPLIED_MINUTES: u32 = 30;

/// Row id of a stored account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Wraps a row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport security for POP3 and SMTP connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Plain TCP.
    None,
    /// TLS from the first byte.
    #[default]
    Tls,
    /// STARTTLS / STLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tls => "tls",
            Self::StartTls => "starttls",
        }
    }

    pub(crate) fn from_db(s: &str) -> Self {
        match s {
            "none" => Self::None,
            "starttls" => Self::StartTls,
            _ => Self::Tls,
        }
    }
}

/// Which "default account" slot an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultRole {
    /// Default mailbox for incoming mail.
    Incoming,
    /// Default identity for outgoing mail.
    Outgoing,
}

impl DefaultRole {
    /// Both roles.
    pub const ALL: [Self; 2] = [Self::Incoming, Self::Outgoing];

    /// Key stored in the defaults registry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

/// POP3 mailbox configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingConfig {
    /// Whether this account is polled.
    pub enabled: bool,
    /// Server hostname.
    pub host: String,
    /// Server port (default: 995 for TLS, 110 otherwise).
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Login name; the account address is used when empty.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl IncomingConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        match security {
            Security::None | Security::StartTls => 110,
            Security::Tls => 995,
        }
    }
}

/// SMTP server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingConfig {
    /// Whether mail may be sent through this account.
    pub enabled: bool,
    /// Server hostname.
    pub host: String,
    /// Server port (default: 465 for TLS, 587 for STARTTLS).
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Login name; the account address is used when empty.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl OutgoingConfig {
    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(security: Security) -> u16 {
        match security {
            Security::None => 25,
            Security::StartTls => 587,
            Security::Tls => 465,
        }
    }
}

/// First-contact auto reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoReplySettings {
    /// Whether new threads get an auto reply.
    pub enabled: bool,
    /// Reply body; the built-in template is rendered when empty.
    pub message: String,
}

/// Alerts for threads nobody answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnrepliedSettings {
    /// Whether the unreplied sweep covers this account.
    pub enabled: bool,
    /// Free-form recipient list, separated by commas and/or newlines.
    pub recipients: String,
    /// Window in minutes; unset or zero means 30.
    pub minutes: Option<u32>,
}

/// Email account configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    /// Unique identifier (None for unsaved accounts).
    pub id: Option<AccountId>,
    /// Display name; generated from the address when empty.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Service label appended to generated names (e.g. "Support").
    pub service: Option<String>,
    /// POP3 configuration.
    pub incoming: IncomingConfig,
    /// SMTP configuration.
    pub outgoing: OutgoingConfig,
    /// Parent case kind that new threads create.
    pub append_to: Option<String>,
    /// Auto reply settings.
    pub auto_reply: AutoReplySettings,
    /// Unreplied-thread alert settings.
    pub unreplied: UnrepliedSettings,
    /// Holds the default-incoming slot.
    pub default_incoming: bool,
    /// Holds the default-outgoing slot.
    pub default_outgoing: bool,
}

impl Account {
    /// An empty, unsaved account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for `email`, with POP3/SMTP servers pre-filled for a few
    /// large providers.
    #[must_use]
    pub fn with_email(email: &str) -> Self {
        let mut account = Self {
            email: email.to_string(),
            ..Default::default()
        };

        if let Some(domain) = email.split('@').nth(1) {
            let preset = match domain.to_lowercase().as_str() {
                "gmail.com" | "googlemail.com" => Some((
                    "pop.gmail.com",
                    "smtp.gmail.com",
                    465,
                    Security::Tls,
                )),
                "outlook.com" | "hotmail.com" | "live.com" => Some((
                    "outlook.office365.com",
                    "smtp.office365.com",
                    587,
                    Security::StartTls,
                )),
                "yahoo.com" | "ymail.com" => Some((
                    "pop.mail.yahoo.com",
                    "smtp.mail.yahoo.com",
                    465,
                    Security::Tls,
                )),
                "icloud.com" | "me.com" | "mac.com" => Some((
                    "pop.mail.me.com",
                    "smtp.mail.me.com",
                    587,
                    Security::StartTls,
                )),
                _ => None,
            };

            if let Some((pop_host, smtp_host, smtp_port, smtp_security)) = preset {
                account.incoming.host = pop_host.to_string();
                account.incoming.port = 995;
                account.incoming.security = Security::Tls;
                account.outgoing.host = smtp_host.to_string();
                account.outgoing.port = smtp_port;
                account.outgoing.security = smtp_security;
            }
        }

        account.incoming.username = email.to_string();
        account.outgoing.username = email.to_string();

        account
    }

    /// Name generated from the address: local part with `_`, `.` and `-`
    /// turned into spaces, title-cased, then the service label if any.
    #[must_use]
    pub fn generated_name(&self) -> String {
        let local = self.email.split('@').next().unwrap_or_default();
        let mut name = local
            .replace(['_', '.', '-'], " ")
            .split_whitespace()
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(service) = self.service.as_deref().filter(|s| !s.trim().is_empty()) {
            name.push(' ');
            name.push_str(service.trim());
        }
        name
    }

    /// Fills in the generated name when none is set.
    pub fn apply_auto_name(&mut self) {
        if self.name.trim().is_empty() {
            self.name = self.generated_name();
        }
    }

    /// Login used for POP3.
    #[must_use]
    pub fn incoming_login(&self) -> &str {
        non_empty_or(&self.incoming.username, &self.email)
    }

    /// Login used for SMTP.
    #[must_use]
    pub fn outgoing_login(&self) -> &str {
        non_empty_or(&self.outgoing.username, &self.email)
    }

    /// Whether the account holds the given default slot.
    #[must_use]
    pub const fn is_default_for(&self, role: DefaultRole) -> bool {
        match role {
            DefaultRole::Incoming => self.default_incoming,
            DefaultRole::Outgoing => self.default_outgoing,
        }
    }

    /// Parsed unreplied notification recipients.
    #[must_use]
    pub fn notification_recipients(&self) -> Vec<String> {
        parse_recipient_list(&self.unreplied.recipients)
    }

    /// Configured unreplied window, 30 minutes when unset or zero.
    #[must_use]
    pub fn unreplied_minutes(&self) -> u32 {
        self.unreplied
            .minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_UNREPLIED_MINUTES)
    }

    /// Configured unreplied window as a duration.
    #[must_use]
    pub fn unreplied_window(&self) -> Duration {
        Duration::minutes(i64::from(self.unreplied_minutes()))
    }

    /// Whether the unreplied sweep covers this account.
    #[must_use]
    pub fn watches_unreplied(&self) -> bool {
        self.incoming.enabled && self.unreplied.enabled && self.append_to.is_some()
    }
}

/// Splits a recipient list on commas and newlines, dropping blanks.
#[must_use]
pub fn parse_recipient_list(list: &str) -> Vec<String> {
    list.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod account_id_tests {
        use super::*;

        #[test]
        fn display() {
            let id = AccountId::new(123);
            assert_eq!(format!("{id}"), "123");
        }
    }

    mod security_tests {
        use super::*;

        #[test]
        fn default_is_tls() {
            assert_eq!(Security::default(), Security::Tls);
        }

        #[test]
        fn db_round_trip() {
            for security in [Security::None, Security::Tls, Security::StartTls] {
                assert_eq!(Security::from_db(security.as_str()), security);
            }
        }

        #[test]
        fn default_ports() {
            assert_eq!(IncomingConfig::default_port(Security::Tls), 995);
            assert_eq!(IncomingConfig::default_port(Security::StartTls), 110);
            assert_eq!(OutgoingConfig::default_port(Security::StartTls), 587);
            assert_eq!(OutgoingConfig::default_port(Security::None), 25);
        }
    }

    mod account_tests {
        use super::*;

        #[test]
        fn with_email_gmail() {
            let account = Account::with_email("user@gmail.com");
            assert_eq!(account.incoming.host, "pop.gmail.com");
            assert_eq!(account.incoming.port, 995);
            assert_eq!(account.outgoing.host, "smtp.gmail.com");
            assert_eq!(account.outgoing.port, 465);
            assert_eq!(account.incoming.username, "user@gmail.com");
        }

        #[test]
        fn with_email_outlook() {
            let account = Account::with_email("user@hotmail.com");
            assert_eq!(account.outgoing.host, "smtp.office365.com");
            assert_eq!(account.outgoing.security, Security::StartTls);
        }

        #[test]
        fn with_email_unknown_domain() {
            let account = Account::with_email("user@example.org");
            assert!(account.incoming.host.is_empty());
            assert!(account.outgoing.host.is_empty());
            assert_eq!(account.outgoing.username, "user@example.org");
        }

        #[test]
        fn generated_name_from_address() {
            let mut account = Account::with_email("customer_care.team-eu@example.com");
            assert_eq!(account.generated_name(), "Customer Care Team Eu");

            account.service = Some("Support".into());
            assert_eq!(account.generated_name(), "Customer Care Team Eu Support");
        }

        #[test]
        fn auto_name_keeps_explicit_name() {
            let mut account = Account::with_email("help@example.com");
            account.name = "Helpdesk".into();
            account.apply_auto_name();
            assert_eq!(account.name, "Helpdesk");

            account.name = "  ".into();
            account.apply_auto_name();
            assert_eq!(account.name, "Help");
        }

        #[test]
        fn unreplied_window_defaults_to_thirty_minutes() {
            let mut account = Account::new();
            assert_eq!(account.unreplied_minutes(), 30);
            account.unreplied.minutes = Some(0);
            assert_eq!(account.unreplied_minutes(), 30);
            account.unreplied.minutes = Some(45);
            assert_eq!(account.unreplied_window(), Duration::minutes(45));
        }

        #[test]
        fn logins_fall_back_to_address() {
            let mut account = Account::with_email("a@example.com");
            account.incoming.username.clear();
            assert_eq!(account.incoming_login(), "a@example.com");
            account.outgoing.username = "relay-user".into();
            assert_eq!(account.outgoing_login(), "relay-user");
        }

        #[test]
        fn import_from_partial_json() {
            let account: Account = serde_json::from_str(
                r#"{ "email": "desk@example.com", "incoming": { "enabled": true, "host": "pop.example.com", "port": 995 }, "append_to": "Issue" }"#,
            )
            .unwrap();
            assert!(account.incoming.enabled);
            assert_eq!(account.incoming.security, Security::Tls);
            assert_eq!(account.append_to.as_deref(), Some("Issue"));
            assert!(!account.outgoing.enabled);
        }
    }

    #[test]
    fn recipient_list_splits_commas_and_newlines() {
        let list = parse_recipient_list("a@example.com, b@example.com\n\n c@example.com,\r\n");
        assert_eq!(list, ["a@example.com", "b@example.com", "c@example.com"]);
        assert!(parse_recipient_list("  ").is_empty());
    }

    proptest::proptest! {
        #[test]
        fn recipient_list_entries_are_clean(input in "[a-z@.,\\n ]{0,64}") {
            for entry in parse_recipient_list(&input) {
                proptest::prop_assert!(!entry.is_empty());
                proptest::prop_assert!(!entry.contains([',', '\n']));
                proptest::prop_assert_eq!(entry.trim(), entry.as_str());
            }
        }
    }
}
