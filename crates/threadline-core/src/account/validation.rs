//! Account validation.

use super::model::Account;
use crate::case::CaseKinds;

/// Validation error for account configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is empty.
    EmptyEmail,
    /// Email address format is invalid.
    InvalidEmail,
    /// POP3 host is empty while incoming is enabled.
    EmptyPop3Host,
    /// POP3 port is invalid while incoming is enabled.
    InvalidPop3Port,
    /// SMTP host is empty while outgoing is enabled.
    EmptySmtpHost,
    /// SMTP port is invalid while outgoing is enabled.
    InvalidSmtpPort,
    /// The append-to kind is not a registered parent case kind.
    UnknownAppendTo(String),
    /// A notification recipient is not a valid address.
    InvalidRecipient(String),
    /// Unreplied alerts are enabled without any recipient.
    NoRecipients,
}

impl ValidationError {
    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::InvalidEmail => "email",
            Self::EmptyPop3Host => "incoming.host",
            Self::InvalidPop3Port => "incoming.port",
            Self::EmptySmtpHost => "outgoing.host",
            Self::InvalidSmtpPort => "outgoing.port",
            Self::UnknownAppendTo(_) => "append_to",
            Self::InvalidRecipient(_) | Self::NoRecipients => "unreplied.recipients",
        }
    }

    /// Returns true for errors about a missing connection parameter.
    #[must_use]
    pub const fn is_missing_connection_parameter(&self) -> bool {
        matches!(
            self,
            Self::EmptyPop3Host | Self::InvalidPop3Port | Self::EmptySmtpHost | Self::InvalidSmtpPort
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmail => f.write_str("Email address is required"),
            Self::InvalidEmail => f.write_str("Invalid email address format"),
            Self::EmptyPop3Host => f.write_str("POP3 server is required"),
            Self::InvalidPop3Port => f.write_str("POP3 port must be 1-65535"),
            Self::EmptySmtpHost => f.write_str("SMTP server is required"),
            Self::InvalidSmtpPort => f.write_str("SMTP port must be 1-65535"),
            Self::UnknownAppendTo(kind) => write!(f, "Unknown case kind for append to: {kind}"),
            Self::InvalidRecipient(email) => write!(f, "Invalid notification recipient: {email}"),
            Self::NoRecipients => f.write_str("Unreplied notifications need at least one recipient"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating an account.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate an account configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any fields are invalid.
pub fn validate_account(account: &Account, kinds: &CaseKinds) -> ValidationResult {
    let mut errors = Vec::new();

    if account.email.trim().is_empty() {
        errors.push(ValidationError::EmptyEmail);
    } else if !is_valid_email(&account.email) {
        errors.push(ValidationError::InvalidEmail);
    }

    if account.incoming.enabled {
        if account.incoming.host.trim().is_empty() {
            errors.push(ValidationError::EmptyPop3Host);
        }
        if account.incoming.port == 0 {
            errors.push(ValidationError::InvalidPop3Port);
        }
    }

    if account.outgoing.enabled {
        if account.outgoing.host.trim().is_empty() {
            errors.push(ValidationError::EmptySmtpHost);
        }
        if account.outgoing.port == 0 {
            errors.push(ValidationError::InvalidSmtpPort);
        }
    }

    if let Some(kind) = &account.append_to
        && !kinds.contains(kind)
    {
        errors.push(ValidationError::UnknownAppendTo(kind.clone()));
    }

    if account.unreplied.enabled {
        let recipients = account.notification_recipients();
        if recipients.is_empty() {
            errors.push(ValidationError::NoRecipients);
        }
        errors.extend(
            recipients
                .into_iter()
                .filter(|e| !is_valid_email(e))
                .map(ValidationError::InvalidRecipient),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Basic email validation.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return false;
    }

    // Domain must contain at least one dot and no empty labels
    domain.contains('.') && domain.split('.').all(|p| !p.is_empty())
}
